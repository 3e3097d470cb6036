// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run lifecycle management: tool servers and checkpoint policy.

use crate::tools::ToolRegistry;
use serde_json::Map;
use skein_core::{Clock, LogLevel, SystemClock};
use skein_storage::{CheckpointStore, RunCheckpoint};
use skein_workflow::{WorkflowContext, WorkflowDef};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// How long a tool server may take to answer its tool list.
const LIST_TOOLS_TIMEOUT: Duration = Duration::from_secs(10);

/// Readiness polling: 20 attempts at 500ms caps the wait at 10s.
const READY_POLL_ATTEMPTS: u32 = 20;
const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Callback the lifecycle manager uses to write into a run's log.
pub type LifecycleLog<'a> = &'a (dyn Fn(LogLevel, String) + Send + Sync);

/// Tool-server startup failure, carrying the instances already started so
/// the caller can stop them.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ToolServerStartError {
    pub started: Vec<String>,
    pub message: String,
}

/// Owns the tool registry and tool-server manager for the process, and
/// applies checkpoint policy on behalf of run workers.
pub struct LifecycleManager<C: Clock = SystemClock> {
    servers: Arc<dyn skein_adapters::ToolServerManager>,
    registry: Arc<ToolRegistry>,
    checkpoints: Option<Arc<CheckpointStore>>,
    clock: C,
}

impl<C: Clock> LifecycleManager<C> {
    pub fn new(
        servers: Arc<dyn skein_adapters::ToolServerManager>,
        registry: Arc<ToolRegistry>,
        checkpoints: Option<Arc<CheckpointStore>>,
        clock: C,
    ) -> Self {
        Self {
            servers,
            registry,
            checkpoints,
            clock,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Start every tool server a workflow declares, discover its tools,
    /// and register them.
    ///
    /// Instance names are scoped `<run-id>/<server>` so concurrent runs of
    /// one workflow cannot collide; registry keys stay `server.tool`. On
    /// failure the instances already started are returned for cleanup.
    pub async fn start_tool_servers(
        &self,
        cancel: &CancellationToken,
        run_id: &str,
        def: &WorkflowDef,
        log: LifecycleLog<'_>,
    ) -> Result<Vec<String>, ToolServerStartError> {
        let mut started = Vec::new();

        for server in &def.tool_servers {
            let instance = format!("{run_id}/{}", server.name);
            log(LogLevel::Info, format!("Starting tool server: {}", server.name));

            let config = skein_adapters::ToolServerConfig {
                name: instance.clone(),
                command: server.command.clone(),
                args: server.args.clone(),
                env: server
                    .env
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                startup_timeout: server
                    .timeout_seconds
                    .map(Duration::from_secs)
                    .unwrap_or(skein_adapters::subprocess::TOOL_SERVER_STARTUP_TIMEOUT),
            };

            if let Err(e) = self.servers.start(config).await {
                return Err(ToolServerStartError {
                    started,
                    message: format!("failed to start tool server '{}': {e}", server.name),
                });
            }
            started.push(instance.clone());

            let client = match self.await_client(cancel, &instance).await {
                Ok(client) => client,
                Err(message) => {
                    return Err(ToolServerStartError { started, message });
                }
            };

            let tools = match tokio::time::timeout(LIST_TOOLS_TIMEOUT, client.list_tools()).await {
                Ok(Ok(tools)) => tools,
                Ok(Err(e)) => {
                    return Err(ToolServerStartError {
                        started,
                        message: format!("failed to list tools for '{}': {e}", server.name),
                    });
                }
                Err(_) => {
                    return Err(ToolServerStartError {
                        started,
                        message: format!("tool list for '{}' timed out", server.name),
                    });
                }
            };

            for tool in tools {
                let tool_name = tool.name.clone();
                if self.registry.register(&server.name, tool) {
                    log(
                        LogLevel::Info,
                        format!("Registered tool: {}.{}", server.name, tool_name),
                    );
                }
            }
            log(LogLevel::Info, format!("Tool server ready: {}", server.name));
        }

        Ok(started)
    }

    /// Poll for a server's client until it is ready or the wait is
    /// exhausted.
    async fn await_client(
        &self,
        cancel: &CancellationToken,
        instance: &str,
    ) -> Result<Arc<dyn skein_adapters::ToolClient>, String> {
        for _ in 0..READY_POLL_ATTEMPTS {
            if cancel.is_cancelled() {
                return Err(format!("cancelled while waiting for '{instance}'"));
            }
            match self.servers.client(instance).await {
                Ok(client) => return Ok(client),
                Err(skein_adapters::ToolServerError::NotReady(_)) => {
                    tokio::time::sleep(READY_POLL_INTERVAL).await;
                }
                Err(e) => return Err(format!("tool server '{instance}': {e}")),
            }
        }
        Err(format!(
            "tool server '{instance}' not ready after {}s",
            (READY_POLL_ATTEMPTS * READY_POLL_INTERVAL.as_millis() as u32) / 1000
        ))
    }

    /// Best-effort stop of the given server instances.
    pub async fn stop_tool_servers(&self, names: &[String], log: LifecycleLog<'_>) {
        for name in names {
            if let Err(e) = self.servers.stop(name).await {
                tracing::warn!(server = %name, error = %e, "tool server stop failed");
                log(LogLevel::Warn, format!("Failed to stop tool server: {e}"));
            }
        }
    }

    /// Save a pre-step checkpoint. No-op without an enabled store; errors
    /// are logged, never propagated into the run.
    pub async fn save_checkpoint(
        &self,
        run_id: &str,
        workflow_name: &str,
        workflow_hash: &str,
        step_id: &str,
        step_index: usize,
        ctx: &WorkflowContext,
    ) {
        let Some(store) = self.enabled_store() else {
            return;
        };
        let checkpoint = RunCheckpoint {
            run_id: run_id.to_string(),
            workflow_name: workflow_name.to_string(),
            workflow_hash: workflow_hash.to_string(),
            current_step_id: step_id.to_string(),
            step_index,
            context: ctx.to_value(),
            step_outputs: ctx
                .to_value()
                .get("steps")
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_else(Map::new),
            saved_at: self.clock.utc_now(),
        };
        let run_id = run_id.to_string();
        let result = tokio::task::spawn_blocking(move || store.save(&checkpoint)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(%run_id, error = %e, "checkpoint save failed"),
            Err(e) => tracing::warn!(%run_id, error = %e, "checkpoint task failed"),
        }
    }

    /// Delete a run's checkpoint after successful completion.
    pub async fn cleanup_checkpoint(&self, run_id: &str) {
        let Some(store) = self.enabled_store() else {
            return;
        };
        let id = run_id.to_string();
        let result = tokio::task::spawn_blocking(move || store.delete(&id)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(%run_id, error = %e, "checkpoint delete failed"),
            Err(e) => tracing::warn!(%run_id, error = %e, "checkpoint task failed"),
        }
    }

    /// List checkpoints left behind by interrupted runs and log each one.
    ///
    /// Called at startup; re-execution is a separate, explicit decision.
    pub async fn resume_interrupted(&self) -> Vec<RunCheckpoint> {
        let Some(store) = self.enabled_store() else {
            return Vec::new();
        };
        let result = tokio::task::spawn_blocking(move || store.list_interrupted()).await;
        let found = match result {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "checkpoint listing failed");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(error = %e, "checkpoint task failed");
                return Vec::new();
            }
        };
        for checkpoint in &found {
            tracing::info!(
                run_id = %checkpoint.run_id,
                workflow = %checkpoint.workflow_name,
                step = %checkpoint.current_step_id,
                step_index = checkpoint.step_index,
                "found interrupted run checkpoint"
            );
        }
        found
    }

    fn enabled_store(&self) -> Option<Arc<CheckpointStore>> {
        match &self.checkpoints {
            Some(store) if store.enabled() => Some(Arc::clone(store)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
