// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn config(name: &str, command: &str, args: &[&str]) -> ToolServerConfig {
    config_with_timeout(name, command, args, Duration::from_secs(5))
}

fn config_with_timeout(
    name: &str,
    command: &str,
    args: &[&str],
    startup_timeout: Duration,
) -> ToolServerConfig {
    ToolServerConfig {
        name: name.to_string(),
        command: command.to_string(),
        args: args.iter().map(|s| s.to_string()).collect(),
        env: Vec::new(),
        startup_timeout,
    }
}

/// A shell one-liner that answers the ping handshake, then one
/// tools/list request.
const LIST_RESPONDER: &str = r#"read _ping; echo '{"ok":true}'; read _line; echo '{"tools":[{"name":"search","description":"find things","input_schema":{}}]}'"#;

async fn wait_status(mgr: &ProcessToolServerManager, name: &str, expected: ToolServerStatus) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while mgr.status(name) != Some(expected) {
        assert!(
            tokio::time::Instant::now() < deadline,
            "server '{name}' stuck at {:?} waiting for {expected}",
            mgr.status(name)
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn start_list_stop_round_trip() {
    let mgr = ProcessToolServerManager::new();
    mgr.start(config("search", "bash", &["-c", LIST_RESPONDER]))
        .await
        .unwrap();
    wait_status(&mgr, "search", ToolServerStatus::Ready).await;
    assert_eq!(mgr.running(), vec!["search"]);

    let client = mgr.client("search").await.unwrap();
    let tools = client.list_tools().await.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "search");
    assert_eq!(tools[0].description, "find things");

    mgr.stop("search").await.unwrap();
    assert_eq!(mgr.status("search"), Some(ToolServerStatus::Stopped));
    assert!(mgr.running().is_empty());
}

#[tokio::test]
async fn server_is_not_ready_until_handshake_answered() {
    let mgr = ProcessToolServerManager::new();
    mgr.start(config("mute", "bash", &["-c", "sleep 30"]))
        .await
        .unwrap();

    // The child is alive but has not answered the ping
    assert_eq!(mgr.status("mute"), Some(ToolServerStatus::Starting));
    let err = mgr.client("mute").await.unwrap_err();
    assert!(matches!(err, ToolServerError::NotReady(_)));

    mgr.stop("mute").await.unwrap();
}

#[tokio::test]
async fn handshake_timeout_marks_server_errored() {
    let mgr = ProcessToolServerManager::new();
    mgr.start(config_with_timeout(
        "deaf",
        "bash",
        &["-c", "sleep 30"],
        Duration::from_millis(100),
    ))
    .await
    .unwrap();

    wait_status(&mgr, "deaf", ToolServerStatus::Errored).await;
    let err = mgr.client("deaf").await.unwrap_err();
    assert!(matches!(err, ToolServerError::SpawnFailed(_)));

    mgr.stop("deaf").await.unwrap();
}

#[tokio::test]
async fn duplicate_start_is_rejected() {
    let mgr = ProcessToolServerManager::new();
    mgr.start(config("dup", "bash", &["-c", "sleep 30"]))
        .await
        .unwrap();
    let err = mgr
        .start(config("dup", "bash", &["-c", "sleep 30"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolServerError::AlreadyRunning(_)));
    mgr.stop("dup").await.unwrap();
}

#[tokio::test]
async fn spawn_failure_marks_server_errored() {
    let mgr = ProcessToolServerManager::new();
    let err = mgr
        .start(config("ghost", "/nonexistent/tool-server", &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolServerError::SpawnFailed(_)));
    assert_eq!(mgr.status("ghost"), Some(ToolServerStatus::Errored));

    // Errored servers have no client
    assert!(mgr.client("ghost").await.is_err());
}

#[tokio::test]
async fn stop_unknown_server_is_not_found() {
    let mgr = ProcessToolServerManager::new();
    let err = mgr.stop("missing").await.unwrap_err();
    assert!(matches!(err, ToolServerError::NotFound(_)));
}

#[tokio::test]
async fn client_for_unknown_server_is_not_found() {
    let mgr = ProcessToolServerManager::new();
    let err = mgr.client("missing").await.unwrap_err();
    assert!(matches!(err, ToolServerError::NotFound(_)));
}

#[tokio::test]
async fn malformed_response_is_a_protocol_error() {
    let mgr = ProcessToolServerManager::new();
    mgr.start(config(
        "bad",
        "bash",
        &["-c", "read _ping; echo pong; read _line; echo 'not json'"],
    ))
    .await
    .unwrap();
    wait_status(&mgr, "bad", ToolServerStatus::Ready).await;

    let client = mgr.client("bad").await.unwrap();
    let err = client.list_tools().await.unwrap_err();
    assert!(matches!(err, ToolServerError::Protocol(_)));
    mgr.stop("bad").await.unwrap();
}
