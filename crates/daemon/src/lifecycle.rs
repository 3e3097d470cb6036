// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use crate::config::DaemonConfig;
use crate::http::AppState;
use crate::{DaemonRunManager, DaemonScheduler};
use fs2::FileExt;
use skein_adapters::{GithubFetcher, ProcessToolServerManager, ShellStepExecutor};
use skein_core::{RunIdGen, SystemClock};
use skein_engine::{
    EngineMetrics, LifecycleManager, LogAggregator, RunManager, RunManagerConfig, StateStore,
    ToolRegistry,
};
use skein_storage::{CheckpointStore, FileBackend, StorageError};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Rotate the daemon log once it grows past this size.
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Errors from daemon startup
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot determine state directory (HOME unset)")]
    NoStateDir,
    #[error("another daemon already holds {0}")]
    AlreadyRunning(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
}

/// Fixed locations under the state directory.
#[derive(Debug, Clone)]
pub struct Paths {
    pub state_dir: PathBuf,
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub checkpoints_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Paths {
    /// Resolve paths under the user's state directory.
    pub fn resolve() -> Result<Self, LifecycleError> {
        let state_dir = crate::env::state_dir()?;
        Ok(Self {
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            checkpoints_dir: state_dir.join("checkpoints"),
            cache_dir: state_dir.join("cache"),
            state_dir,
        })
    }
}

/// Result of daemon startup, ready to serve.
pub struct StartupResult {
    pub app: AppState,
    pub listener: TcpListener,
    pub scheduler: Arc<DaemonScheduler>,
    pub drain_timeout: std::time::Duration,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
}

/// Take the single-instance lock, writing our pid into it.
pub fn acquire_lock(path: &PathBuf) -> Result<File, LifecycleError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)?;
    if file.try_lock_exclusive().is_err() {
        return Err(LifecycleError::AlreadyRunning(path.clone()));
    }
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

/// Rename an oversized log aside so the daemon starts with a fresh file.
pub fn rotate_log_if_needed(path: &PathBuf) {
    let Ok(metadata) = std::fs::metadata(path) else {
        return;
    };
    if metadata.len() > MAX_LOG_SIZE {
        let rotated = path.with_extension("log.old");
        if let Err(e) = std::fs::rename(path, &rotated) {
            eprintln!("warning: failed to rotate log {}: {e}", path.display());
        }
    }
}

/// Wire together storage, engine, and the HTTP listener.
pub async fn start(config: DaemonConfig, paths: Paths) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&paths.state_dir)?;
    let lock_file = acquire_lock(&paths.lock_path)?;

    let backend = Arc::new(FileBackend::open(&paths.state_dir)?);
    let checkpoints = Arc::new(CheckpointStore::new(
        paths.checkpoints_dir.clone(),
        config.checkpoints_enabled,
    ));

    let store = Arc::new(StateStore::new(
        backend.clone() as Arc<dyn skein_storage::Backend>,
        SystemClock,
        RunIdGen,
    ));
    let lifecycle = Arc::new(LifecycleManager::new(
        Arc::new(ProcessToolServerManager::new()),
        Arc::new(ToolRegistry::new()),
        Some(checkpoints),
        SystemClock,
    ));
    let metrics = Arc::new(EngineMetrics::new());
    let runner: Arc<DaemonRunManager> = Arc::new(RunManager::new(
        store,
        Arc::new(LogAggregator::new()),
        lifecycle,
        Arc::new(ShellStepExecutor::new()),
        Some(Arc::new(GithubFetcher::new(Some(paths.cache_dir.clone())))),
        Arc::clone(&metrics),
        RunManagerConfig {
            max_parallel: config.max_parallel,
            run_timeout: config.run_timeout(),
            workflows_dir: config.workflows_dir.clone(),
        },
    ));

    // Surface what a previous process left behind
    let interrupted = runner.lifecycle().resume_interrupted().await;
    if !interrupted.is_empty() {
        info!(count = interrupted.len(), "interrupted runs found at startup");
    }

    let scheduler = Arc::new(DaemonScheduler::new(
        Arc::clone(&runner),
        backend as Arc<dyn skein_storage::Backend>,
        metrics,
        SystemClock,
    ));
    scheduler.load(config.schedule_defs()).await;

    let listener =
        TcpListener::bind(&config.listen_addr)
            .await
            .map_err(|source| LifecycleError::Bind {
                addr: config.listen_addr.clone(),
                source,
            })?;
    info!(addr = %config.listen_addr, "daemon listening");

    let drain_timeout = config.drain_timeout();

    Ok(StartupResult {
        app: AppState {
            runner,
            workflows_dir: config.workflows_dir,
            started_at: Instant::now(),
        },
        listener,
        scheduler,
        drain_timeout,
        lock_file,
    })
}

/// Serve until a shutdown signal arrives, then drain and stop.
pub async fn run(startup: StartupResult) -> Result<(), LifecycleError> {
    let StartupResult {
        app,
        listener,
        scheduler,
        drain_timeout,
        lock_file,
    } = startup;

    let scheduler_cancel = CancellationToken::new();
    let scheduler_task = {
        let scheduler = Arc::clone(&scheduler);
        let cancel = scheduler_cancel.clone();
        tokio::spawn(async move { scheduler.run(cancel).await })
    };

    let runner = Arc::clone(&app.runner);
    let router = crate::http::router(app);

    let shutdown = async move {
        wait_for_signal().await;
        info!("shutdown signal received; draining");
        runner.start_draining();
        if runner.wait_for_drain(drain_timeout).await {
            info!("all runs drained");
        } else {
            warn!(
                active = runner.active_run_count(),
                "drain timed out with runs still active"
            );
        }
        scheduler_cancel.cancel();
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    let _ = scheduler_task.await;
    drop(lock_file);
    info!("daemon stopped");
    Ok(())
}

async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let ctrl_c = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c => {}
                _ = term.recv() => {}
            }
        }
        Err(_) => {
            let _ = ctrl_c.await;
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
