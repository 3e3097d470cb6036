//! Shared harness: an in-process daemon served on an ephemeral port.

use skein_adapters::FakeStepExecutor;
use skein_core::{RunIdGen, SystemClock};
use skein_daemon::http::{router, AppState};
use skein_daemon::DaemonRunManager;
use skein_engine::{
    EngineMetrics, LifecycleManager, LogAggregator, RunManager, RunManagerConfig, StateStore,
    ToolRegistry,
};
use skein_storage::{Backend, MemoryBackend};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// A running daemon instance backed by a fake step executor.
pub struct TestDaemon {
    pub base_url: String,
    pub client: reqwest::Client,
    pub executor: FakeStepExecutor,
    pub runner: Arc<DaemonRunManager>,
    _workflows: Option<TempDir>,
    _server: tokio::task::JoinHandle<()>,
}

/// Start a daemon with the given named workflows available on disk.
pub async fn spawn_daemon(workflows: &[(&str, &str)]) -> TestDaemon {
    let workflows_tmp = if workflows.is_empty() {
        None
    } else {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in workflows {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        Some(dir)
    };
    let workflows_dir = workflows_tmp.as_ref().map(|d| d.path().to_path_buf());

    let backend = Arc::new(MemoryBackend::new());
    let store = Arc::new(StateStore::new(
        backend as Arc<dyn Backend>,
        SystemClock,
        RunIdGen,
    ));
    let lifecycle = Arc::new(LifecycleManager::new(
        Arc::new(skein_adapters::ProcessToolServerManager::new()),
        Arc::new(ToolRegistry::new()),
        None,
        SystemClock,
    ));
    let executor = FakeStepExecutor::new();
    let runner: Arc<DaemonRunManager> = Arc::new(RunManager::new(
        store,
        Arc::new(LogAggregator::new()),
        lifecycle,
        Arc::new(executor.clone()),
        None,
        Arc::new(EngineMetrics::new()),
        RunManagerConfig {
            workflows_dir: workflows_dir.clone(),
            ..Default::default()
        },
    ));

    let app = router(AppState {
        runner: Arc::clone(&runner),
        workflows_dir,
        started_at: Instant::now(),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestDaemon {
        base_url: format!("http://{addr}"),
        client: reqwest::Client::new(),
        executor,
        runner,
        _workflows: workflows_tmp,
        _server: server,
    }
}

impl TestDaemon {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Poll a run until it reaches the expected status.
    pub async fn wait_for_status(&self, id: &str, expected: &str) -> serde_json::Value {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let body: serde_json::Value = self
                .client
                .get(self.url(&format!("/v1/runs/{id}")))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            if body["status"] == expected {
                return body;
            }
            assert!(
                Instant::now() < deadline,
                "run {id} stuck at {} waiting for {expected}",
                body["status"]
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// One-step workflow used across the specs.
pub const HELLO: &str = "name: hello\nsteps:\n  - id: greet\n    prompt: say hi\n";
