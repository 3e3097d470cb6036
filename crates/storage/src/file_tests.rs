// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use skein_core::RunStatus;

fn record(id: &str) -> RunRecord {
    RunRecord {
        id: id.to_string(),
        workflow_name: "wf".to_string(),
        status: "pending".to_string(),
        correlation_id: "corr".to_string(),
        inputs: Default::default(),
        output: Default::default(),
        error: None,
        current_step: None,
        completed: 0,
        total: 2,
        started_at: None,
        completed_at: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.create_run(&record("r1")).await.unwrap();
    }

    let backend = FileBackend::open(dir.path()).unwrap();
    let loaded = backend.get_run("r1").await.unwrap();
    assert_eq!(loaded.workflow_name, "wf");
    assert_eq!(loaded.total, 2);
}

#[tokio::test]
async fn update_replaces_record() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FileBackend::open(dir.path()).unwrap();
    backend.create_run(&record("r1")).await.unwrap();

    let mut updated = record("r1");
    updated.status = "failed".to_string();
    updated.error = Some("step exploded".to_string());
    backend.update_run(&updated).await.unwrap();

    let loaded = backend.get_run("r1").await.unwrap();
    assert_eq!(loaded.status(), Some(RunStatus::Failed));
    assert_eq!(loaded.error.as_deref(), Some("step exploded"));
}

#[tokio::test]
async fn list_skips_corrupt_files() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FileBackend::open(dir.path()).unwrap();
    backend.create_run(&record("good")).await.unwrap();
    std::fs::write(dir.path().join("runs/bad.json"), b"{not json").unwrap();

    let all = backend.list_runs(&RunFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, "good");
}

#[tokio::test]
async fn delete_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FileBackend::open(dir.path()).unwrap();
    backend.create_run(&record("r1")).await.unwrap();
    backend.delete_run("r1").await.unwrap();
    backend.delete_run("r1").await.unwrap();
    assert!(backend.get_run("r1").await.is_err());
}

#[tokio::test]
async fn checkpoint_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FileBackend::open(dir.path()).unwrap();
    assert!(backend.get_checkpoint("r1").await.unwrap().is_none());

    let checkpoint = RunCheckpoint {
        run_id: "r1".to_string(),
        workflow_name: "wf".to_string(),
        workflow_hash: "hash".to_string(),
        current_step_id: "b".to_string(),
        step_index: 1,
        context: serde_json::json!({ "inputs": {} }),
        step_outputs: Default::default(),
        saved_at: Utc::now(),
    };
    backend.save_checkpoint(&checkpoint).await.unwrap();

    let loaded = backend.get_checkpoint("r1").await.unwrap().unwrap();
    assert_eq!(loaded.step_index, 1);
}

#[tokio::test]
async fn schedule_state_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FileBackend::open(dir.path()).unwrap();
    let state = ScheduleState {
        last_run_at: None,
        run_count: 9,
        error_count: 0,
    };
    backend.save_schedule_state("hourly", &state).await.unwrap();
    let loaded = backend.get_schedule_state("hourly").await.unwrap().unwrap();
    assert_eq!(loaded.run_count, 9);
}
