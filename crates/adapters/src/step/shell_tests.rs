// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::step::StepResultStatus;
use serde_json::Map as JsonMap;

fn command_step(id: &str, command: &str) -> StepDef {
    StepDef {
        id: id.to_string(),
        kind: StepKind::Command,
        command: Some(command.to_string()),
        ..Default::default()
    }
}

fn empty_ctx() -> WorkflowContext {
    WorkflowContext::new(JsonMap::new())
}

#[tokio::test]
async fn successful_command_captures_stdout() {
    let executor = ShellStepExecutor::new();
    let step = command_step("greet", "echo hello");
    let result = executor
        .execute(&CancellationToken::new(), &step, &empty_ctx())
        .await
        .unwrap();

    assert_eq!(result.status, StepResultStatus::Success);
    assert_eq!(result.output["text"], "hello");
    assert_eq!(result.output["exit_code"], 0);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn failing_command_reports_exit_status() {
    let executor = ShellStepExecutor::new();
    let step = command_step("boom", "echo oops >&2; exit 3");
    let result = executor
        .execute(&CancellationToken::new(), &step, &empty_ctx())
        .await
        .unwrap();

    assert_eq!(result.status, StepResultStatus::Failed);
    let error = result.error.unwrap();
    assert!(error.contains("status 3"), "got: {error}");
    assert!(error.contains("oops"), "got: {error}");
}

#[tokio::test]
async fn command_interpolates_context() {
    let mut inputs = JsonMap::new();
    inputs.insert("name".to_string(), serde_json::json!("skein"));
    let ctx = WorkflowContext::new(inputs);

    let executor = ShellStepExecutor::new();
    let step = command_step("greet", "echo hello ${inputs.name}");
    let result = executor
        .execute(&CancellationToken::new(), &step, &ctx)
        .await
        .unwrap();
    assert_eq!(result.output["text"], "hello skein");
}

#[tokio::test]
async fn step_timeout_maps_to_deadline_exceeded() {
    let executor = ShellStepExecutor::new();
    let mut step = command_step("slow", "sleep 30");
    step.timeout_seconds = Some(0);

    let err = executor
        .execute(&CancellationToken::new(), &step, &empty_ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, StepExecutorError::DeadlineExceeded));
    assert!(err.is_cancellation());
}

#[tokio::test]
async fn cancellation_interrupts_running_command() {
    let executor = ShellStepExecutor::new();
    let step = command_step("slow", "sleep 30");
    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel_clone.cancel();
    });

    let err = executor.execute(&cancel, &step, &empty_ctx()).await.unwrap_err();
    assert!(matches!(err, StepExecutorError::Cancelled));
}

#[tokio::test]
async fn prompt_step_is_rejected() {
    let executor = ShellStepExecutor::new();
    let step = StepDef {
        id: "think".to_string(),
        kind: StepKind::Prompt,
        prompt: Some("hi".to_string()),
        ..Default::default()
    };
    let err = executor
        .execute(&CancellationToken::new(), &step, &empty_ctx())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("provider-backed"), "got: {err}");
}
