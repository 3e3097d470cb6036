// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered step execution.
//!
//! Turns a parsed workflow plus inputs into an [`ExecutionResult`] by
//! executing the step executor once per step, in declaration order. No
//! retries; cancellation is observed cooperatively at step boundaries and
//! propagated through the step executor.

use crate::output::StepOutput;
use async_trait::async_trait;
use serde_json::{Map, Value};
use skein_adapters::{StepExecutor, StepResult, StepResultStatus};
use skein_core::LogLevel;
use skein_workflow::{WorkflowContext, WorkflowDef};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Why a sequence stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    /// Cancellation observed at a step boundary or inside a step
    Cancelled,
    /// A step failed and its definition did not ignore errors
    StepFailed { step_id: String, message: String },
}

/// Outcome of executing a workflow's steps.
#[derive(Debug, Default)]
pub struct ExecutionResult {
    /// Typed output of the last successful step
    pub last_output: Option<StepOutput>,
    pub duration: Duration,
    /// Raw executor results in execution order
    pub step_results: Vec<StepResult>,
    /// Typed outputs of successful steps, keyed by step id
    pub step_outputs: HashMap<String, StepOutput>,
    pub error: Option<SequenceError>,
}

/// Callbacks invoked as the sequence progresses.
///
/// The context handed to `on_step_start` reflects every step finished so
/// far; checkpointing hooks off it.
#[async_trait]
pub trait SequenceObserver: Send + Sync {
    async fn on_step_start(
        &self,
        _step_id: &str,
        _index: usize,
        _total: usize,
        _ctx: &WorkflowContext,
    ) {
    }

    async fn on_step_end(&self, _step_id: &str, _result: &StepResult) {}

    async fn on_log(&self, _level: LogLevel, _message: &str, _step_id: Option<&str>) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

#[async_trait]
impl SequenceObserver for NoopObserver {}

/// Execute a workflow's steps in declaration order.
pub async fn run_steps(
    cancel: &CancellationToken,
    executor: &dyn StepExecutor,
    def: &WorkflowDef,
    inputs: Map<String, Value>,
    observer: &dyn SequenceObserver,
) -> ExecutionResult {
    let start = Instant::now();
    let total = def.steps.len();
    let mut ctx = WorkflowContext::new(inputs);
    let mut result = ExecutionResult::default();

    for (index, step) in def.steps.iter().enumerate() {
        if cancel.is_cancelled() {
            result.error = Some(SequenceError::Cancelled);
            break;
        }

        observer.on_step_start(&step.id, index, total, &ctx).await;

        let step_result = match executor.execute(cancel, step, &ctx).await {
            Ok(step_result) => step_result,
            Err(e) if e.is_cancellation() => {
                observer
                    .on_log(
                        LogLevel::Warn,
                        &format!("Step interrupted: {}", step.id),
                        Some(&step.id),
                    )
                    .await;
                result.error = Some(SequenceError::Cancelled);
                break;
            }
            Err(e) => {
                // The executor never produced a result; synthesize a
                // failed one so callbacks and history stay uniform.
                StepResult::failed(&step.id, e.to_string(), Duration::ZERO)
            }
        };

        observer.on_step_end(&step.id, &step_result).await;

        let failed = step_result.status == StepResultStatus::Failed;
        let error_text = step_result
            .error
            .clone()
            .unwrap_or_else(|| "step failed".to_string());
        let succeeded = step_result.status == StepResultStatus::Success;
        if succeeded {
            ctx.record_step_output(&step.id, step_result.output.clone());
        }
        result.step_results.push(step_result.clone());

        if failed {
            if step.ignores_errors() {
                observer
                    .on_log(
                        LogLevel::Info,
                        &format!("Ignoring step failure: {error_text}"),
                        Some(&step.id),
                    )
                    .await;
                continue;
            }
            result.error = Some(SequenceError::StepFailed {
                step_id: step.id.clone(),
                message: error_text,
            });
            break;
        }

        if succeeded {
            let typed = StepOutput::from_result(&step_result);
            result.step_outputs.insert(step.id.clone(), typed.clone());
            result.last_output = Some(typed);
        }
    }

    result.duration = start.elapsed();
    result
}

#[cfg(test)]
#[path = "sequencer_tests.rs"]
mod tests;
