// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn captures_output_of_fast_command() {
    let mut cmd = Command::new("echo");
    cmd.arg("hello");
    let output = run_with_timeout(&CancellationToken::new(), cmd, Duration::from_secs(5), "echo")
        .await
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
}

#[tokio::test]
async fn times_out_slow_command() {
    let mut cmd = Command::new("sleep");
    cmd.arg("30");
    let err = run_with_timeout(
        &CancellationToken::new(),
        cmd,
        Duration::from_millis(50),
        "sleep",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SubprocessError::TimedOut { .. }));
    assert!(err.to_string().contains("timed out"), "got: {err}");
}

#[tokio::test]
async fn cancellation_wins_over_running_command() {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel_clone.cancel();
    });

    let mut cmd = Command::new("sleep");
    cmd.arg("30");
    let err = run_with_timeout(&cancel, cmd, Duration::from_secs(30), "sleep")
        .await
        .unwrap_err();
    assert!(matches!(err, SubprocessError::Cancelled { .. }));
}

#[tokio::test]
async fn reports_spawn_failure() {
    let cmd = Command::new("/nonexistent/binary/for/sure");
    let err = run_with_timeout(&CancellationToken::new(), cmd, Duration::from_secs(1), "ghost")
        .await
        .unwrap_err();
    assert!(matches!(err, SubprocessError::Io { .. }));
    assert!(err.to_string().contains("failed"), "got: {err}");
}
