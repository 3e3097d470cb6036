//! Log streaming over SSE.

use crate::prelude::{spawn_daemon, HELLO};
use skein_adapters::ScriptedResult;
use std::time::Duration;

/// Read an SSE body until a `done` event arrives (or time runs out).
async fn read_until_done(mut response: reqwest::Response) -> String {
    let mut text = String::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !text.contains("event: done") {
        let chunk = tokio::time::timeout_at(deadline, response.chunk())
            .await
            .expect("SSE stream never produced a done event")
            .unwrap();
        match chunk {
            Some(bytes) => text.push_str(&String::from_utf8_lossy(&bytes)),
            None => break,
        }
    }
    text
}

#[tokio::test]
async fn live_stream_delivers_logs_then_done() {
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

    // Attach while the step is still blocked
    let response = daemon
        .client
        .get(daemon.url(&format!("/v1/runs/{id}/logs")))
        .header("accept", "text/event-stream")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    daemon.executor.release("greet");
    let text = read_until_done(response).await;

    // Entries arrive in generation order, the done event carries the
    // terminal status, and nothing follows it
    let started = text.find("Workflow started: hello").unwrap();
    let step = text.find("Step completed: greet").unwrap();
    let completed = text.find("Workflow completed: hello").unwrap();
    assert!(started < step && step < completed);
    assert!(text.contains(r#"{"status":"completed"}"#));
    assert!(text.rfind("event: log").unwrap() < text.rfind("event: done").unwrap());
}

#[tokio::test]
async fn json_logs_for_finished_run() {
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

    let body: serde_json::Value = daemon
        .client
        .get(daemon.url(&format!("/v1/runs/{id}/logs")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let logs = body["logs"].as_array().unwrap();
    assert_eq!(logs.first().unwrap()["message"], "Workflow started: hello");
    assert_eq!(logs.last().unwrap()["message"], "Workflow completed: hello");
    // Every entry carries the run's correlation id
    assert!(logs.iter().all(|l| l["correlation_id"] == submitted["correlation_id"]));
}
