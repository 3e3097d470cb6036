// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex;
use serde_json::json;
use skein_adapters::{FakeStepExecutor, ScriptedResult};
use skein_workflow::{ErrorStrategy, OnErrorDef, StepDef};
use std::sync::Arc;

fn step(id: &str) -> StepDef {
    StepDef {
        id: id.to_string(),
        prompt: Some("hi".to_string()),
        ..Default::default()
    }
}

fn ignoring_step(id: &str) -> StepDef {
    StepDef {
        on_error: Some(OnErrorDef {
            strategy: ErrorStrategy::Ignore,
        }),
        ..step(id)
    }
}

fn def(steps: Vec<StepDef>) -> WorkflowDef {
    WorkflowDef {
        name: "demo".to_string(),
        steps,
        ..Default::default()
    }
}

/// Observer recording callback invocations as strings.
#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

#[async_trait]
impl SequenceObserver for RecordingObserver {
    async fn on_step_start(
        &self,
        step_id: &str,
        index: usize,
        total: usize,
        _ctx: &WorkflowContext,
    ) {
        self.events
            .lock()
            .push(format!("start:{step_id}:{index}/{total}"));
    }

    async fn on_step_end(&self, step_id: &str, result: &StepResult) {
        self.events
            .lock()
            .push(format!("end:{step_id}:{:?}", result.status));
    }

    async fn on_log(&self, level: skein_core::LogLevel, message: &str, _step_id: Option<&str>) {
        self.events.lock().push(format!("log:{level}:{message}"));
    }
}

#[tokio::test]
async fn executes_steps_in_declaration_order() {
    let executor = FakeStepExecutor::new();
    let observer = RecordingObserver::default();
    let workflow = def(vec![step("a"), step("b"), step("c")]);

    let result = run_steps(
        &CancellationToken::new(),
        &executor,
        &workflow,
        Map::new(),
        &observer,
    )
    .await;

    assert!(result.error.is_none());
    assert_eq!(executor.calls(), vec!["a", "b", "c"]);
    assert_eq!(result.step_results.len(), 3);
    assert_eq!(result.step_outputs.len(), 3);

    let events = observer.events.lock().clone();
    assert_eq!(events[0], "start:a:0/3");
    assert_eq!(events[1], "end:a:Success");
    assert_eq!(events[4], "start:c:2/3");
}

#[tokio::test]
async fn last_output_comes_from_final_successful_step() {
    let executor = FakeStepExecutor::new();
    let mut output = Map::new();
    output.insert("response".to_string(), json!("final answer"));
    executor.script("b", ScriptedResult::Success(output));

    let workflow = def(vec![step("a"), step("b")]);
    let result = run_steps(
        &CancellationToken::new(),
        &executor,
        &workflow,
        Map::new(),
        &NoopObserver,
    )
    .await;

    assert_eq!(result.last_output.unwrap().text, "final answer");
}

#[tokio::test]
async fn step_outputs_thread_into_later_context() {
    let executor = FakeStepExecutor::new();
    let mut output = Map::new();
    output.insert("text".to_string(), json!("from a"));
    executor.script("a", ScriptedResult::Success(output));

    /// Observer asserting the context visible at step b's start.
    struct ContextProbe;

    #[async_trait]
    impl SequenceObserver for ContextProbe {
        async fn on_step_start(
            &self,
            step_id: &str,
            _index: usize,
            _total: usize,
            ctx: &WorkflowContext,
        ) {
            if step_id == "b" {
                assert_eq!(
                    ctx.step_output("a"),
                    Some(&json!({ "text": "from a" }))
                );
            }
        }
    }

    let workflow = def(vec![step("a"), step("b")]);
    let result = run_steps(
        &CancellationToken::new(),
        &executor,
        &workflow,
        Map::new(),
        &ContextProbe,
    )
    .await;
    assert!(result.error.is_none());
}

#[tokio::test]
async fn failed_step_stops_the_sequence() {
    let executor = FakeStepExecutor::new();
    executor.script("a", ScriptedResult::Failure("step exploded".to_string()));

    let workflow = def(vec![step("a"), step("b")]);
    let result = run_steps(
        &CancellationToken::new(),
        &executor,
        &workflow,
        Map::new(),
        &NoopObserver,
    )
    .await;

    assert_eq!(
        result.error,
        Some(SequenceError::StepFailed {
            step_id: "a".to_string(),
            message: "step exploded".to_string(),
        })
    );
    // Step b never executed
    assert_eq!(executor.calls(), vec!["a"]);
    assert_eq!(result.step_results.len(), 1);
    assert!(result.last_output.is_none());
}

#[tokio::test]
async fn ignore_strategy_continues_past_failure() {
    let executor = FakeStepExecutor::new();
    executor.script("a", ScriptedResult::Failure("step exploded".to_string()));

    let workflow = def(vec![ignoring_step("a"), step("b")]);
    let result = run_steps(
        &CancellationToken::new(),
        &executor,
        &workflow,
        Map::new(),
        &NoopObserver,
    )
    .await;

    assert!(result.error.is_none());
    assert_eq!(executor.calls(), vec!["a", "b"]);
    // The failed step contributed no typed output
    assert!(!result.step_outputs.contains_key("a"));
    assert!(result.step_outputs.contains_key("b"));
}

#[tokio::test]
async fn executor_error_respects_ignore_strategy() {
    let executor = FakeStepExecutor::new();
    executor.script("a", ScriptedResult::Error("adapter broke".to_string()));

    let workflow = def(vec![ignoring_step("a"), step("b")]);
    let result = run_steps(
        &CancellationToken::new(),
        &executor,
        &workflow,
        Map::new(),
        &NoopObserver,
    )
    .await;

    assert!(result.error.is_none());
    assert_eq!(executor.calls(), vec!["a", "b"]);
}

#[tokio::test]
async fn pre_cancelled_token_short_circuits() {
    let executor = FakeStepExecutor::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let workflow = def(vec![step("a")]);
    let result = run_steps(&cancel, &executor, &workflow, Map::new(), &NoopObserver).await;

    assert_eq!(result.error, Some(SequenceError::Cancelled));
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn cancellation_mid_step_stops_sequence() {
    let executor = FakeStepExecutor::new();
    executor.script("a", ScriptedResult::Block);
    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        cancel_clone.cancel();
    });

    let workflow = def(vec![step("a"), step("b")]);
    let result = run_steps(&cancel, &executor, &workflow, Map::new(), &NoopObserver).await;

    assert_eq!(result.error, Some(SequenceError::Cancelled));
    assert_eq!(executor.calls(), vec!["a"]);
}

#[tokio::test]
async fn skipped_steps_do_not_produce_outputs() {
    let executor = FakeStepExecutor::new();
    executor.script("a", ScriptedResult::Skipped);

    let workflow = def(vec![step("a"), step("b")]);
    let result = run_steps(
        &CancellationToken::new(),
        &executor,
        &workflow,
        Map::new(),
        &NoopObserver,
    )
    .await;

    assert!(result.error.is_none());
    assert!(!result.step_outputs.contains_key("a"));
    // The later step still ran and produced the last output
    assert!(result.last_output.is_some());
}
