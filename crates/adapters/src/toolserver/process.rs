// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess-backed tool-server manager
//!
//! Children are spawned with piped stdio and spoken to in line-delimited
//! JSON: one request object per line on stdin, one response object per
//! line on stdout. This is a stopgap wire format. A server is only
//! `ready` once it has answered a `{"method":"ping"}` handshake (any
//! response line counts), bounded by the configured startup timeout; the
//! discovery request is `{"method":"tools/list"}` and the expected
//! response carries a `tools` array.

use super::{
    ToolClient, ToolDefinition, ToolServerConfig, ToolServerError, ToolServerManager,
    ToolServerStatus,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// Default time to wait for a single protocol response.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

struct ServerHandle {
    status: ToolServerStatus,
    child: Option<Child>,
    client: Option<Arc<ProcessToolClient>>,
}

/// Tool-server manager that spawns local subprocesses.
#[derive(Clone, Default)]
pub struct ProcessToolServerManager {
    servers: Arc<Mutex<HashMap<String, ServerHandle>>>,
}

impl ProcessToolServerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of servers that are not yet stopped.
    pub fn running(&self) -> Vec<String> {
        self.servers
            .lock()
            .iter()
            .filter(|(_, h)| {
                matches!(h.status, ToolServerStatus::Starting | ToolServerStatus::Ready)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl ToolServerManager for ProcessToolServerManager {
    async fn start(&self, config: ToolServerConfig) -> Result<(), ToolServerError> {
        {
            let servers = self.servers.lock();
            if let Some(handle) = servers.get(&config.name) {
                if !matches!(handle.status, ToolServerStatus::Stopped) {
                    return Err(ToolServerError::AlreadyRunning(config.name));
                }
            }
        }

        tracing::info!(server = %config.name, command = %config.command, "starting tool server");

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.servers.lock().insert(
                    config.name.clone(),
                    ServerHandle {
                        status: ToolServerStatus::Errored,
                        child: None,
                        client: None,
                    },
                );
                return Err(ToolServerError::SpawnFailed(format!(
                    "{}: {}",
                    config.command, e
                )));
            }
        };

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let (Some(stdin), Some(stdout)) = (stdin, stdout) else {
            let _ = child.start_kill();
            return Err(ToolServerError::SpawnFailed(format!(
                "{}: stdio not piped",
                config.command
            )));
        };

        let client = Arc::new(ProcessToolClient {
            name: config.name.clone(),
            stdin: tokio::sync::Mutex::new(stdin),
            stdout: tokio::sync::Mutex::new(BufReader::new(stdout).lines()),
        });

        self.servers.lock().insert(
            config.name.clone(),
            ServerHandle {
                status: ToolServerStatus::Starting,
                child: Some(child),
                client: Some(Arc::clone(&client)),
            },
        );

        // Ready only once the child answers the handshake; until then
        // callers polling for a client see NotReady
        let servers = Arc::clone(&self.servers);
        let name = config.name.clone();
        let startup_timeout = config.startup_timeout;
        tokio::spawn(async move {
            let handshake = tokio::time::timeout(startup_timeout, client.ping()).await;
            let mut servers = servers.lock();
            let Some(handle) = servers.get_mut(&name) else {
                return;
            };
            // A stop that raced the handshake wins
            if handle.status != ToolServerStatus::Starting {
                return;
            }
            match handshake {
                Ok(Ok(())) => {
                    handle.status = ToolServerStatus::Ready;
                }
                Ok(Err(e)) => {
                    tracing::warn!(server = %name, error = %e, "tool server handshake failed");
                    handle.status = ToolServerStatus::Errored;
                }
                Err(_) => {
                    tracing::warn!(
                        server = %name,
                        timeout_s = startup_timeout.as_secs(),
                        "tool server handshake timed out"
                    );
                    handle.status = ToolServerStatus::Errored;
                }
            }
        });
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<(), ToolServerError> {
        let (child, known) = {
            let mut servers = self.servers.lock();
            match servers.get_mut(name) {
                Some(handle) => {
                    handle.status = ToolServerStatus::Stopped;
                    handle.client = None;
                    (handle.child.take(), true)
                }
                None => (None, false),
            }
        };
        if !known {
            return Err(ToolServerError::NotFound(name.to_string()));
        }

        if let Some(mut child) = child {
            if let Err(e) = child.start_kill() {
                // Already exited is fine; anything else is worth surfacing
                if child.try_wait().map(|s| s.is_none()).unwrap_or(true) {
                    return Err(ToolServerError::StopFailed(format!("{name}: {e}")));
                }
            }
            let _ = child.wait().await;
        }
        tracing::info!(server = %name, "tool server stopped");
        Ok(())
    }

    async fn client(&self, name: &str) -> Result<Arc<dyn ToolClient>, ToolServerError> {
        let servers = self.servers.lock();
        let handle = servers
            .get(name)
            .ok_or_else(|| ToolServerError::NotFound(name.to_string()))?;
        match handle.status {
            ToolServerStatus::Ready => handle
                .client
                .clone()
                .map(|c| c as Arc<dyn ToolClient>)
                .ok_or_else(|| ToolServerError::NotReady(name.to_string())),
            // Still waiting on the handshake: worth polling again
            ToolServerStatus::Starting => Err(ToolServerError::NotReady(name.to_string())),
            ToolServerStatus::Errored => Err(ToolServerError::SpawnFailed(format!(
                "{name}: handshake failed"
            ))),
            ToolServerStatus::Stopped => Err(ToolServerError::NotFound(name.to_string())),
        }
    }

    fn status(&self, name: &str) -> Option<ToolServerStatus> {
        self.servers.lock().get(name).map(|h| h.status)
    }
}

struct ProcessToolClient {
    name: String,
    stdin: tokio::sync::Mutex<ChildStdin>,
    stdout: tokio::sync::Mutex<tokio::io::Lines<BufReader<ChildStdout>>>,
}

#[derive(Deserialize)]
struct ToolListResponse {
    #[serde(default)]
    tools: Vec<ToolDefinition>,
}

impl ProcessToolClient {
    /// Startup handshake: any response line to a ping counts as alive.
    async fn ping(&self) -> Result<(), ToolServerError> {
        self.request(json!({ "method": "ping" })).await.map(|_| ())
    }

    async fn request(&self, body: serde_json::Value) -> Result<String, ToolServerError> {
        let line = format!("{body}\n");
        {
            let mut stdin = self.stdin.lock().await;
            stdin
                .write_all(line.as_bytes())
                .await
                .map_err(|e| ToolServerError::Protocol(format!("{}: write: {}", self.name, e)))?;
            stdin
                .flush()
                .await
                .map_err(|e| ToolServerError::Protocol(format!("{}: flush: {}", self.name, e)))?;
        }

        let mut stdout = self.stdout.lock().await;
        let response = tokio::time::timeout(RESPONSE_TIMEOUT, stdout.next_line())
            .await
            .map_err(|_| ToolServerError::Protocol(format!("{}: response timed out", self.name)))?
            .map_err(|e| ToolServerError::Protocol(format!("{}: read: {}", self.name, e)))?;
        response.ok_or_else(|| {
            ToolServerError::Protocol(format!("{}: server closed stdout", self.name))
        })
    }
}

#[async_trait]
impl ToolClient for ProcessToolClient {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolServerError> {
        let raw = self.request(json!({ "method": "tools/list" })).await?;
        let parsed: ToolListResponse = serde_json::from_str(&raw)
            .map_err(|e| ToolServerError::Protocol(format!("{}: {}", self.name, e)))?;
        Ok(parsed.tools)
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
