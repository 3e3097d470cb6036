// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake step executor for deterministic testing

use super::{StepExecutor, StepExecutorError, StepResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use skein_workflow::{StepDef, WorkflowContext};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// What the fake should do when a given step executes.
#[derive(Debug, Clone)]
pub enum ScriptedResult {
    /// Return a successful result with this output mapping
    Success(Map<String, Value>),
    /// Return a result with status failed and this error text
    Failure(String),
    /// Return a result with status skipped
    Skipped,
    /// Return `Err(StepExecutorError::Failed(..))`
    Error(String),
    /// Park until `release(step_id)` is called (or cancellation fires),
    /// then return an empty success
    Block,
}

/// Fake step executor for testing
///
/// Allows programmatic control over step behavior and records all calls.
#[derive(Clone, Default)]
pub struct FakeStepExecutor {
    inner: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    scripted: HashMap<String, VecDeque<ScriptedResult>>,
    default: Option<ScriptedResult>,
    calls: Vec<String>,
    gates: HashMap<String, Arc<Notify>>,
}

impl FakeStepExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result for the next execution of `step_id`.
    pub fn script(&self, step_id: &str, result: ScriptedResult) {
        self.inner
            .lock()
            .scripted
            .entry(step_id.to_string())
            .or_default()
            .push_back(result);
    }

    /// Result used when nothing is scripted for a step. The built-in
    /// fallback is a success with `{"response": "ok"}`.
    pub fn set_default(&self, result: ScriptedResult) {
        self.inner.lock().default = Some(result);
    }

    /// Release a step parked by [`ScriptedResult::Block`].
    pub fn release(&self, step_id: &str) {
        let gate = self
            .inner
            .lock()
            .gates
            .entry(step_id.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone();
        gate.notify_waiters();
        gate.notify_one();
    }

    /// Step ids in execution order.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().calls.clone()
    }

    /// How many times a step has executed.
    pub fn call_count(&self, step_id: &str) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| c.as_str() == step_id)
            .count()
    }

    fn next_result(&self, step_id: &str) -> ScriptedResult {
        let mut state = self.inner.lock();
        state.calls.push(step_id.to_string());
        if let Some(queue) = state.scripted.get_mut(step_id) {
            if let Some(result) = queue.pop_front() {
                return result;
            }
        }
        state.default.clone().unwrap_or_else(|| {
            let mut out = Map::new();
            out.insert("response".to_string(), Value::String("ok".to_string()));
            ScriptedResult::Success(out)
        })
    }

    fn gate(&self, step_id: &str) -> Arc<Notify> {
        self.inner
            .lock()
            .gates
            .entry(step_id.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }
}

#[async_trait]
impl StepExecutor for FakeStepExecutor {
    async fn execute(
        &self,
        cancel: &CancellationToken,
        step: &StepDef,
        _ctx: &WorkflowContext,
    ) -> Result<StepResult, StepExecutorError> {
        let duration = Duration::from_millis(10);
        match self.next_result(&step.id) {
            ScriptedResult::Success(output) => Ok(StepResult::success(&step.id, output, duration)),
            ScriptedResult::Failure(error) => Ok(StepResult::failed(&step.id, error, duration)),
            ScriptedResult::Skipped => Ok(StepResult::skipped(&step.id, duration)),
            ScriptedResult::Error(message) => Err(StepExecutorError::Failed(message)),
            ScriptedResult::Block => {
                let gate = self.gate(&step.id);
                tokio::select! {
                    _ = gate.notified() => {
                        Ok(StepResult::success(&step.id, Map::new(), duration))
                    }
                    _ = cancel.cancelled() => Err(StepExecutorError::Cancelled),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
