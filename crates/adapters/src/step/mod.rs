// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step execution adapters
//!
//! The `StepExecutor` trait is the seam between the engine and whatever
//! actually performs a step's work: a shell command, a language-model
//! provider call, or a scripted fake in tests. The engine calls it once
//! per step, in declaration order, and never retries.

mod shell;

pub use shell::ShellStepExecutor;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeStepExecutor, ScriptedResult};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use skein_workflow::{StepDef, WorkflowContext};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors from step execution
#[derive(Debug, Error)]
pub enum StepExecutorError {
    /// The run was cancelled while the step executed
    #[error("step cancelled")]
    Cancelled,
    /// The step's own deadline elapsed
    #[error("step deadline exceeded")]
    DeadlineExceeded,
    /// The executor could not run the step at all
    #[error("{0}")]
    Failed(String),
}

impl StepExecutorError {
    /// Cancellation and deadline expiry downgrade a run to `cancelled`
    /// rather than `failed`.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            StepExecutorError::Cancelled | StepExecutorError::DeadlineExceeded
        )
    }
}

/// Outcome the executor reports for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepResultStatus {
    Success,
    Failed,
    /// The step elected not to run (e.g. a conditional that didn't match)
    Skipped,
}

/// Typed result of executing one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub status: StepResultStatus,
    /// Raw output mapping; the engine collapses this into its typed form
    pub output: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration: Duration,
}

impl StepResult {
    /// Successful result carrying an output mapping.
    pub fn success(step_id: &str, output: Map<String, Value>, duration: Duration) -> Self {
        Self {
            step_id: step_id.to_string(),
            status: StepResultStatus::Success,
            output,
            error: None,
            duration,
        }
    }

    /// Failed result carrying an error message.
    pub fn failed(step_id: &str, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            step_id: step_id.to_string(),
            status: StepResultStatus::Failed,
            output: Map::new(),
            error: Some(error.into()),
            duration,
        }
    }

    /// Skipped result.
    pub fn skipped(step_id: &str, duration: Duration) -> Self {
        Self {
            step_id: step_id.to_string(),
            status: StepResultStatus::Skipped,
            output: Map::new(),
            error: None,
            duration,
        }
    }
}

/// Executes one workflow step.
#[async_trait]
pub trait StepExecutor: Send + Sync + 'static {
    /// Execute a step against the current template context.
    ///
    /// Implementations must observe `cancel` (returning
    /// [`StepExecutorError::Cancelled`] promptly once it fires) and must
    /// populate the result's `duration`.
    async fn execute(
        &self,
        cancel: &CancellationToken,
        step: &StepDef,
        ctx: &WorkflowContext,
    ) -> Result<StepResult, StepExecutorError>;
}
