// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell command step executor

use super::{StepExecutor, StepExecutorError, StepResult};
use crate::subprocess::{run_with_timeout, SubprocessError, SHELL_COMMAND_TIMEOUT};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use skein_workflow::{interpolate, StepDef, StepKind, WorkflowContext};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Executes `command` steps via `bash -c` on the daemon host.
///
/// Prompt steps need a provider-backed executor supplied by the embedder;
/// this one fails them with an explicit error rather than guessing.
#[derive(Debug, Clone, Default)]
pub struct ShellStepExecutor;

impl ShellStepExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StepExecutor for ShellStepExecutor {
    async fn execute(
        &self,
        cancel: &CancellationToken,
        step: &StepDef,
        ctx: &WorkflowContext,
    ) -> Result<StepResult, StepExecutorError> {
        let start = Instant::now();

        if step.kind != StepKind::Command {
            return Err(StepExecutorError::Failed(format!(
                "step '{}' requires a provider-backed executor (type: {:?})",
                step.id, step.kind
            )));
        }
        let template = step.command.as_deref().ok_or_else(|| {
            StepExecutorError::Failed(format!("command step '{}' has no command", step.id))
        })?;

        let command = interpolate(template, &ctx.template_values());
        let timeout = step
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(SHELL_COMMAND_TIMEOUT);

        tracing::info!(step = %step.id, %command, "running shell step");

        let wrapped = format!("set -euo pipefail\n{command}");
        let mut cmd = Command::new("bash");
        cmd.arg("-c").arg(&wrapped).kill_on_drop(true);

        let description = format!("step '{}'", step.id);
        let output = run_with_timeout(cancel, cmd, timeout, &description)
            .await
            .map_err(|e| match e {
                SubprocessError::Cancelled { .. } => StepExecutorError::Cancelled,
                SubprocessError::TimedOut { .. } => StepExecutorError::DeadlineExceeded,
                io => StepExecutorError::Failed(io.to_string()),
            })?;

        let duration = start.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            tracing::warn!(step = %step.id, stderr = %stderr, "shell step stderr");
        }

        if output.status.success() {
            let mut out = Map::new();
            out.insert("text".to_string(), Value::String(stdout));
            out.insert("exit_code".to_string(), json!(0));
            Ok(StepResult::success(&step.id, out, duration))
        } else {
            let code = output.status.code().unwrap_or(-1);
            let message = if stderr.is_empty() {
                format!("command exited with status {code}")
            } else {
                format!("command exited with status {code}: {}", stderr.trim_end())
            };
            Ok(StepResult::failed(&step.id, message, duration))
        }
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
