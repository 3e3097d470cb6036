// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool-server management adapters
//!
//! A tool server is an auxiliary subprocess launched for a run that
//! exposes discoverable *tools* callable by steps. The manager owns the
//! child processes; the engine drives the lifecycle (start before the
//! first step, stop when the run terminates) and registers discovered
//! tools in its registry.

mod process;

pub use process::ProcessToolServerManager;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeToolServerManager, ToolServerCall};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from tool-server operations
#[derive(Debug, Error)]
pub enum ToolServerError {
    #[error("tool server not found: {0}")]
    NotFound(String),
    #[error("tool server '{0}' already running")]
    AlreadyRunning(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("tool server '{0}' is not ready")]
    NotReady(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("stop failed: {0}")]
    StopFailed(String),
}

/// Lifecycle state of a tool server.
///
/// `starting → ready → stopped`; any state may fall into `errored`, from
/// which only `stopped` is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolServerStatus {
    Starting,
    Ready,
    Stopped,
    Errored,
}

impl fmt::Display for ToolServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolServerStatus::Starting => write!(f, "starting"),
            ToolServerStatus::Ready => write!(f, "ready"),
            ToolServerStatus::Stopped => write!(f, "stopped"),
            ToolServerStatus::Errored => write!(f, "errored"),
        }
    }
}

/// Configuration for starting a tool server instance.
#[derive(Debug, Clone)]
pub struct ToolServerConfig {
    /// Instance name (unique among running servers)
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub startup_timeout: Duration,
}

/// A callable tool discovered from a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON schema of the tool's arguments
    #[serde(default)]
    pub input_schema: Value,
}

/// Client handle for a running tool server.
#[async_trait]
pub trait ToolClient: Send + Sync {
    /// Ask the server for its tool list.
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolServerError>;
}

impl std::fmt::Debug for dyn ToolClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn ToolClient")
    }
}

/// Manages tool-server subprocesses.
#[async_trait]
pub trait ToolServerManager: Send + Sync + 'static {
    /// Start a server instance. Fails if the name is already running.
    async fn start(&self, config: ToolServerConfig) -> Result<(), ToolServerError>;

    /// Stop a server instance, killing the subprocess if needed.
    async fn stop(&self, name: &str) -> Result<(), ToolServerError>;

    /// Resolve a client for a running server. Returns
    /// [`ToolServerError::NotReady`] while the server is still starting.
    async fn client(&self, name: &str) -> Result<Arc<dyn ToolClient>, ToolServerError>;

    /// Current lifecycle status, if the server is known.
    fn status(&self, name: &str) -> Option<ToolServerStatus>;
}
