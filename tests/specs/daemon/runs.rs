//! Run submission, inspection, and cancellation over HTTP.

use crate::prelude::{spawn_daemon, HELLO};
use serde_json::json;
use skein_adapters::ScriptedResult;

#[tokio::test]
async fn submit_and_complete_single_step_run() {
    let daemon = spawn_daemon(&[]).await;
    let mut output = serde_json::Map::new();
    output.insert("response".to_string(), json!("hi"));
    daemon.executor.script("greet", ScriptedResult::Success(output));

    let submitted: serde_json::Value = daemon
        .client
        .post(daemon.url("/v1/runs"))
        .header("content-type", "application/x-yaml")
        .body(HELLO)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(submitted["status"], "pending");
    let id = submitted["id"].as_str().unwrap().to_string();

    let done = daemon.wait_for_status(&id, "completed").await;
    assert_eq!(done["output"]["response"], "hi");
    assert_eq!(done["progress"], json!({ "completed": 1, "total": 1 }));

    let output: serde_json::Value = daemon
        .client
        .get(daemon.url(&format!("/v1/runs/{id}/output")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(output["response"], "hi");
}

#[tokio::test]
async fn failed_step_yields_failed_run() {
    let daemon = spawn_daemon(&[]).await;
    daemon
        .executor
        .script("greet", ScriptedResult::Failure("no provider".to_string()));

    let submitted: serde_json::Value = daemon
        .client
        .post(daemon.url("/v1/runs"))
        .header("content-type", "text/yaml")
        .body(HELLO)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = submitted["id"].as_str().unwrap().to_string();

    let done = daemon.wait_for_status(&id, "failed").await;
    assert_eq!(done["error"], "no provider");

    // Output stays gated behind completion
    let response = daemon
        .client
        .get(daemon.url(&format!("/v1/runs/{id}/output")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn cancel_a_blocked_run() {
    let daemon = spawn_daemon(&[]).await;
    daemon.executor.script("greet", ScriptedResult::Block);

    let submitted: serde_json::Value = daemon
        .client
        .post(daemon.url("/v1/runs"))
        .header("content-type", "application/x-yaml")
        .body(HELLO)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = submitted["id"].as_str().unwrap().to_string();
    daemon.wait_for_status(&id, "running").await;

    let response = daemon
        .client
        .delete(daemon.url(&format!("/v1/runs/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);

    let done = daemon.wait_for_status(&id, "cancelled").await;
    assert_eq!(done["error"], "cancelled by user");
    assert!(done["completed_at"].is_string());
}

#[tokio::test]
async fn list_reflects_filters() {
    let daemon = spawn_daemon(&[]).await;
    let submitted: serde_json::Value = daemon
        .client
        .post(daemon.url("/v1/runs"))
        .header("content-type", "application/x-yaml")
        .body(HELLO)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = submitted["id"].as_str().unwrap().to_string();
    daemon.wait_for_status(&id, "completed").await;

    let listed: serde_json::Value = daemon
        .client
        .get(daemon.url("/v1/runs?status=completed&workflow=hello"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["runs"].as_array().unwrap().len(), 1);

    let empty: serde_json::Value = daemon
        .client
        .get(daemon.url("/v1/runs?workflow=other"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(empty["runs"].as_array().unwrap().is_empty());
}
