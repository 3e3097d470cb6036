// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn lock_is_exclusive_per_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daemon.pid");

    let first = acquire_lock(&path).unwrap();
    let err = acquire_lock(&path).unwrap_err();
    assert!(matches!(err, LifecycleError::AlreadyRunning(_)));

    // Releasing the first lock lets a new holder in
    drop(first);
    acquire_lock(&path).unwrap();
}

#[test]
fn lock_file_records_pid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daemon.pid");
    let _lock = acquire_lock(&path).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.trim(), std::process::id().to_string());
}

#[test]
fn small_logs_are_not_rotated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daemon.log");
    std::fs::write(&path, b"short").unwrap();

    rotate_log_if_needed(&path);
    assert!(path.exists());
    assert!(!dir.path().join("daemon.log.old").exists());
}

#[tokio::test]
async fn start_binds_and_wires_state() {
    let state = tempfile::tempdir().unwrap();
    let paths = Paths {
        state_dir: state.path().to_path_buf(),
        lock_path: state.path().join("daemon.pid"),
        log_path: state.path().join("daemon.log"),
        checkpoints_dir: state.path().join("checkpoints"),
        cache_dir: state.path().join("cache"),
    };
    let config = DaemonConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        ..Default::default()
    };

    let startup = start(config, paths).await.unwrap();
    assert_eq!(startup.app.runner.active_run_count(), 0);
    assert!(!startup.app.runner.is_draining());
    assert!(startup.listener.local_addr().unwrap().port() > 0);
}
