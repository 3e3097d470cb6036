//! Drain behavior: refusal of new work while in-flight runs finish.

use crate::prelude::{spawn_daemon, HELLO};
use skein_adapters::ScriptedResult;
use std::time::Duration;

#[tokio::test]
async fn draining_rejects_new_submissions_and_finishes_inflight() {
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

    daemon.runner.start_draining();

    let refused = daemon
        .client
        .post(daemon.url("/v1/runs"))
        .header("content-type", "application/x-yaml")
        .body(HELLO)
        .send()
        .await
        .unwrap();
    assert_eq!(refused.status(), 503);
    assert_eq!(refused.headers().get("retry-after").unwrap(), "10");

    let health: serde_json::Value = daemon
        .client
        .get(daemon.url("/healthz"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "draining");

    // The in-flight run still completes and the daemon drains to zero
    daemon.executor.release("greet");
    daemon.wait_for_status(&id, "completed").await;
    assert!(daemon.runner.wait_for_drain(Duration::from_secs(5)).await);
    assert_eq!(daemon.runner.active_run_count(), 0);
}
