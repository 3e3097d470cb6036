// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake tool-server manager for deterministic testing

use super::{
    ToolClient, ToolDefinition, ToolServerConfig, ToolServerError, ToolServerManager,
    ToolServerStatus,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Recorded call to FakeToolServerManager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolServerCall {
    Start { name: String },
    Stop { name: String },
    Client { name: String },
}

#[derive(Default)]
struct FakeState {
    statuses: HashMap<String, ToolServerStatus>,
    tools: HashMap<String, Vec<ToolDefinition>>,
    calls: Vec<ToolServerCall>,
    start_error: Option<String>,
    start_errors: HashMap<String, String>,
    stop_error: Option<String>,
    /// Number of `client()` calls a server stays NotReady for
    not_ready_for: HashMap<String, usize>,
}

/// Fake tool-server manager for testing
///
/// Allows programmatic control over server behavior and records all calls.
#[derive(Clone, Default)]
pub struct FakeToolServerManager {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeToolServerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tools the fake client will report for `server`.
    pub fn set_tools(&self, server: &str, tools: Vec<ToolDefinition>) {
        self.inner.lock().tools.insert(server.to_string(), tools);
    }

    /// Make every `start` call fail with this message.
    pub fn fail_start(&self, message: &str) {
        self.inner.lock().start_error = Some(message.to_string());
    }

    /// Make `start` fail for one server only.
    pub fn fail_start_for(&self, server: &str, message: &str) {
        self.inner
            .lock()
            .start_errors
            .insert(server.to_string(), message.to_string());
    }

    /// Make every `stop` call fail with this message.
    pub fn fail_stop(&self, message: &str) {
        self.inner.lock().stop_error = Some(message.to_string());
    }

    /// Keep a server NotReady for the first `n` client() calls, to
    /// exercise readiness polling.
    pub fn delay_ready(&self, server: &str, n: usize) {
        self.inner.lock().not_ready_for.insert(server.to_string(), n);
    }

    pub fn calls(&self) -> Vec<ToolServerCall> {
        self.inner.lock().calls.clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ToolServerCall::Start { name } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ToolServerCall::Stop { name } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ToolServerManager for FakeToolServerManager {
    async fn start(&self, config: ToolServerConfig) -> Result<(), ToolServerError> {
        let mut state = self.inner.lock();
        state.calls.push(ToolServerCall::Start {
            name: config.name.clone(),
        });
        let failure = state
            .start_errors
            .get(&config.name)
            .or(state.start_error.as_ref())
            .cloned();
        if let Some(message) = failure {
            state
                .statuses
                .insert(config.name.clone(), ToolServerStatus::Errored);
            return Err(ToolServerError::SpawnFailed(message));
        }
        state.statuses.insert(config.name, ToolServerStatus::Ready);
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<(), ToolServerError> {
        let mut state = self.inner.lock();
        state.calls.push(ToolServerCall::Stop {
            name: name.to_string(),
        });
        if let Some(message) = &state.stop_error {
            return Err(ToolServerError::StopFailed(message.clone()));
        }
        state
            .statuses
            .insert(name.to_string(), ToolServerStatus::Stopped);
        Ok(())
    }

    async fn client(&self, name: &str) -> Result<Arc<dyn ToolClient>, ToolServerError> {
        let mut state = self.inner.lock();
        state.calls.push(ToolServerCall::Client {
            name: name.to_string(),
        });
        if !state.statuses.contains_key(name) {
            return Err(ToolServerError::NotFound(name.to_string()));
        }
        if let Some(remaining) = state.not_ready_for.get_mut(name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ToolServerError::NotReady(name.to_string()));
            }
        }
        let tools = state.tools.get(name).cloned().unwrap_or_default();
        Ok(Arc::new(FakeToolClient { tools }))
    }

    fn status(&self, name: &str) -> Option<ToolServerStatus> {
        self.inner.lock().statuses.get(name).copied()
    }
}

struct FakeToolClient {
    tools: Vec<ToolDefinition>,
}

#[async_trait]
impl ToolClient for FakeToolClient {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolServerError> {
        Ok(self.tools.clone())
    }
}
