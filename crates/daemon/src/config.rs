// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration (TOML file + environment overrides).

use serde::Deserialize;
use skein_workflow::ScheduleDef;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

fn default_listen_addr() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_max_parallel() -> usize {
    skein_engine::DEFAULT_MAX_PARALLEL
}

fn default_drain_timeout() -> u64 {
    30
}

fn default_checkpoints() -> bool {
    true
}

/// Daemon configuration as written in skein.toml.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    /// Whole-run deadline in seconds; absent means no deadline
    #[serde(default)]
    pub run_timeout_seconds: Option<u64>,
    /// How long shutdown waits for in-flight runs
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_seconds: u64,
    #[serde(default = "default_checkpoints")]
    pub checkpoints_enabled: bool,
    /// Directory of named workflows (<name>.yaml)
    #[serde(default)]
    pub workflows_dir: Option<PathBuf>,
    /// Cron schedules, keyed by schedule name
    #[serde(default)]
    pub schedules: BTreeMap<String, ScheduleDef>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_parallel: default_max_parallel(),
            run_timeout_seconds: None,
            drain_timeout_seconds: default_drain_timeout(),
            checkpoints_enabled: default_checkpoints(),
            workflows_dir: None,
            schedules: BTreeMap::new(),
        }
    }
}

impl DaemonConfig {
    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::parse(&text)?
            }
            None => Self::default(),
        };
        if let Some(addr) = crate::env::listen_addr() {
            config.listen_addr = addr;
        }
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Schedules with their map keys injected as names.
    pub fn schedule_defs(&self) -> Vec<ScheduleDef> {
        self.schedules
            .iter()
            .map(|(name, def)| {
                let mut def = def.clone();
                def.name = name.clone();
                def
            })
            .collect()
    }

    pub fn run_timeout(&self) -> Option<std::time::Duration> {
        self.run_timeout_seconds.map(std::time::Duration::from_secs)
    }

    pub fn drain_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.drain_timeout_seconds)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
