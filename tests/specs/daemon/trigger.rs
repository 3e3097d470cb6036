//! Per-workflow public trigger with bearer auth.

use crate::prelude::spawn_daemon;
use serde_json::json;

const HOOKED: &str = "\
name: hooked
steps:
  - id: greet
    prompt: say hi
listen:
  api:
    secret: spec-secret
";

#[tokio::test]
async fn trigger_round_trip() {
    let daemon = spawn_daemon(&[("hooked.yaml", HOOKED)]).await;

    // Missing and wrong credentials are refused
    let unauthorized = daemon
        .client
        .post(daemon.url("/v1/start/hooked"))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), 401);

    let wrong = daemon
        .client
        .post(daemon.url("/v1/start/hooked"))
        .bearer_auth("nope")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);

    // The right secret starts a run with the posted inputs
    let accepted: serde_json::Value = daemon
        .client
        .post(daemon.url("/v1/start/hooked"))
        .bearer_auth("spec-secret")
        .json(&json!({ "topic": "rust" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(accepted["workflow_name"], "hooked");
    assert_eq!(accepted["inputs"]["topic"], "rust");

    let id = accepted["id"].as_str().unwrap().to_string();
    daemon.wait_for_status(&id, "completed").await;
}

#[tokio::test]
async fn unknown_workflow_is_404() {
    let daemon = spawn_daemon(&[("hooked.yaml", HOOKED)]).await;
    let response = daemon
        .client
        .post(daemon.url("/v1/start/ghost"))
        .bearer_auth("spec-secret")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}
