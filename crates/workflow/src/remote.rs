// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote workflow references
//!
//! A reference names a workflow file hosted in a GitHub repository:
//! `github:owner/repo[/path][@version]`. The version is classified from its
//! shape: a 7-40 character hex string is a commit, `v` followed by a digit
//! is a tag, anything else is a branch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing a remote reference
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RemoteRefError {
    #[error("reference must start with 'github:'")]
    Scheme,
    #[error("reference must include owner and repository")]
    MissingRepo,
    #[error("empty version after '@'")]
    EmptyVersion,
}

/// Pinned version of a remote reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefVersion {
    Commit(String),
    Tag(String),
    Branch(String),
}

impl RefVersion {
    /// Classify a raw version string by shape.
    pub fn infer(raw: &str) -> Self {
        let is_hex = raw.len() >= 7
            && raw.len() <= 40
            && raw.chars().all(|c| c.is_ascii_hexdigit());
        if is_hex {
            return RefVersion::Commit(raw.to_string());
        }
        let mut chars = raw.chars();
        if chars.next() == Some('v') && chars.next().is_some_and(|c| c.is_ascii_digit()) {
            return RefVersion::Tag(raw.to_string());
        }
        RefVersion::Branch(raw.to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            RefVersion::Commit(s) | RefVersion::Tag(s) | RefVersion::Branch(s) => s,
        }
    }
}

/// Parsed `github:` workflow reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRef {
    pub owner: String,
    pub repo: String,
    /// Path within the repository as written, if any
    pub path: Option<String>,
    pub version: Option<RefVersion>,
}

impl RemoteRef {
    /// The file path to fetch. A missing path, or a path without a
    /// `.yaml`/`.yml` suffix, resolves to `workflow.yaml` in that
    /// directory.
    pub fn file_path(&self) -> String {
        match &self.path {
            None => "workflow.yaml".to_string(),
            Some(p) if p.ends_with(".yaml") || p.ends_with(".yml") => p.clone(),
            Some(p) => format!("{}/workflow.yaml", p.trim_end_matches('/')),
        }
    }

    /// Git revision to fetch, defaulting to HEAD.
    pub fn revision(&self) -> &str {
        self.version.as_ref().map(RefVersion::as_str).unwrap_or("HEAD")
    }
}

impl FromStr for RemoteRef {
    type Err = RemoteRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix("github:").ok_or(RemoteRefError::Scheme)?;

        let (locator, version) = match rest.rsplit_once('@') {
            Some((locator, raw)) => {
                if raw.is_empty() {
                    return Err(RemoteRefError::EmptyVersion);
                }
                (locator, Some(RefVersion::infer(raw)))
            }
            None => (rest, None),
        };

        let mut segments = locator.splitn(3, '/');
        let owner = segments.next().unwrap_or_default();
        let repo = segments.next().unwrap_or_default();
        if owner.is_empty() || repo.is_empty() {
            return Err(RemoteRefError::MissingRepo);
        }
        let path = segments.next().filter(|p| !p.is_empty()).map(String::from);

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            path,
            version,
        })
    }
}

impl fmt::Display for RemoteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "github:{}/{}", self.owner, self.repo)?;
        if let Some(path) = &self.path {
            write!(f, "/{path}")?;
        }
        if let Some(version) = &self.version {
            write!(f, "@{}", version.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
