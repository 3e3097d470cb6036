// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run manager: submission, admission, cancellation, drain.
//!
//! Submit spawns exactly one worker task per run; that task is the sole
//! mutator of the run after Submit returns. External readers only ever
//! see snapshots.

use crate::error::EngineError;
use crate::lifecycle::LifecycleManager;
use crate::logs::{LogAggregator, Subscription};
use crate::metrics::EngineMetrics;
use crate::output::project_output;
use crate::sequencer::{run_steps, SequenceError, SequenceObserver};
use crate::state::StateStore;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use skein_adapters::{Fetcher, StepExecutor, StepResult, StepResultStatus};
use skein_core::{Clock, IdGen, LogEntry, LogLevel, RunId, RunIdGen, RunSnapshot, RunStatus, SystemClock};
use skein_workflow::{find_workflow_file, parse_workflow, RemoteRef, WorkflowContext};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

/// Default execution slot cap.
pub const DEFAULT_MAX_PARALLEL: usize = 10;

/// Where a submitted workflow document comes from.
#[derive(Debug, Clone)]
pub enum WorkflowSource {
    /// Document bytes submitted inline
    Inline(Vec<u8>),
    /// Name resolved in the workflows directory
    Named(String),
    /// `github:` reference fetched remotely
    Remote(String),
}

/// A request to start a run.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub source: WorkflowSource,
    pub inputs: Map<String, Value>,
    pub correlation_id: Option<String>,
    /// Validate and record the step plan without executing
    pub dry_run: bool,
    /// Bypass the remote fetch cache
    pub no_cache: bool,
}

impl SubmitRequest {
    pub fn inline(bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_source(WorkflowSource::Inline(bytes.into()))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::from_source(WorkflowSource::Named(name.into()))
    }

    pub fn remote(reference: impl Into<String>) -> Self {
        Self::from_source(WorkflowSource::Remote(reference.into()))
    }

    fn from_source(source: WorkflowSource) -> Self {
        Self {
            source,
            inputs: Map::new(),
            correlation_id: None,
            dry_run: false,
            no_cache: false,
        }
    }

    pub fn with_inputs(mut self, inputs: Map<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }
}

/// What a cancel request found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The cancellation signal was delivered (or had been already)
    Delivered,
    /// The run reached this terminal status before any cancel arrived
    AlreadyTerminal(RunStatus),
}

/// Tunables for the run manager.
#[derive(Debug, Clone)]
pub struct RunManagerConfig {
    pub max_parallel: usize,
    /// Whole-run deadline; expiry cancels the run
    pub run_timeout: Option<Duration>,
    /// Directory searched for named workflows
    pub workflows_dir: Option<PathBuf>,
}

impl Default for RunManagerConfig {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
            run_timeout: None,
            workflows_dir: None,
        }
    }
}

/// Drives submitted workflows to completion under a bounded parallelism
/// cap, and owns the drain gate.
pub struct RunManager<C: Clock = SystemClock, G: IdGen + 'static = RunIdGen> {
    store: Arc<StateStore<C, G>>,
    logs: Arc<LogAggregator>,
    lifecycle: Arc<LifecycleManager<C>>,
    executor: Arc<dyn StepExecutor>,
    fetcher: Option<Arc<dyn Fetcher>>,
    semaphore: Arc<Semaphore>,
    draining: AtomicBool,
    metrics: Arc<EngineMetrics>,
    config: RunManagerConfig,
}

impl<C: Clock, G: IdGen + 'static> RunManager<C, G> {
    pub fn new(
        store: Arc<StateStore<C, G>>,
        logs: Arc<LogAggregator>,
        lifecycle: Arc<LifecycleManager<C>>,
        executor: Arc<dyn StepExecutor>,
        fetcher: Option<Arc<dyn Fetcher>>,
        metrics: Arc<EngineMetrics>,
        config: RunManagerConfig,
    ) -> Self {
        Self {
            store,
            logs,
            lifecycle,
            executor,
            fetcher,
            semaphore: Arc::new(Semaphore::new(config.max_parallel)),
            draining: AtomicBool::new(false),
            metrics,
            config,
        }
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleManager<C>> {
        &self.lifecycle
    }

    /// Validate, create, and asynchronously execute a run.
    ///
    /// The returned snapshot is taken before execution starts, so its
    /// status is always `pending` (or `dry_run`).
    pub async fn submit(self: &Arc<Self>, req: SubmitRequest) -> Result<RunSnapshot, EngineError> {
        if self.is_draining() {
            return Err(EngineError::draining());
        }

        let (bytes, source_url) = self.resolve_source(&req).await?;
        let def = parse_workflow(&bytes)
            .map_err(|e| EngineError::Validation(format!("failed to parse workflow: {e}")))?;
        let workflow_hash = format!("{:x}", Sha256::digest(&bytes));

        // Declared input defaults sit under the submitted values
        let mut inputs: Map<String, Value> = def
            .inputs
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in req.inputs {
            inputs.insert(key, value);
        }

        let definition = Arc::new(def);
        let created = self
            .store
            .create_run(
                Arc::clone(&definition),
                workflow_hash,
                inputs,
                source_url,
                req.correlation_id,
            )
            .await;
        self.metrics.inc_submitted();
        let run_id = created.snapshot.id.clone();

        if req.dry_run {
            let plan: Vec<Value> = definition
                .steps
                .iter()
                .map(|s| json!({ "id": s.id, "type": s.kind }))
                .collect();
            self.store
                .update(run_id.as_str(), |run| {
                    run.output.insert("plan".to_string(), Value::Array(plan));
                })
                .await;
            let snapshot = self.finalize(&run_id, RunStatus::DryRun, None).await;
            return snapshot.ok_or_else(|| EngineError::Internal("run vanished".to_string()));
        }

        self.metrics.inc_pending();
        let mgr = Arc::clone(self);
        let id = run_id.clone();
        tokio::spawn(async move { mgr.supervise(id).await });

        Ok(created.snapshot)
    }

    /// Snapshot of one run.
    pub fn get(&self, id: &str) -> Result<RunSnapshot, EngineError> {
        self.store
            .get(id)
            .ok_or_else(|| EngineError::NotFound(format!("run '{id}'")))
    }

    /// Snapshots of runs passing the filter.
    pub fn list(&self, filter: &skein_core::RunFilter) -> Vec<RunSnapshot> {
        self.store.list(filter)
    }

    /// Request cancellation of a run.
    ///
    /// Returns as soon as the signal is delivered; it does not wait for
    /// the worker to observe it. Idempotent under concurrency.
    pub fn cancel(&self, id: &str) -> Result<CancelOutcome, EngineError> {
        self.store
            .cancel(id)
            .ok_or_else(|| EngineError::NotFound(format!("run '{id}'")))
    }

    /// Subscribe to a run's live log entries.
    pub fn subscribe(
        &self,
        id: &str,
    ) -> Result<(mpsc::Receiver<LogEntry>, Subscription), EngineError> {
        if self.store.get(id).is_none() {
            return Err(EngineError::NotFound(format!("run '{id}'")));
        }
        Ok(self.logs.subscribe(id))
    }

    pub fn subscriber_count(&self, id: &str) -> usize {
        self.logs.subscriber_count(id)
    }

    /// Refuse new submissions; in-flight runs are left to finish.
    pub fn start_draining(&self) {
        self.draining.store(true, Ordering::SeqCst);
        tracing::info!("draining: new submissions refused");
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    pub fn active_run_count(&self) -> usize {
        self.store.active_count()
    }

    /// Wait until no runs are active. Returns true if the count reached
    /// zero before the timeout.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.active_run_count() == 0 {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    async fn resolve_source(
        &self,
        req: &SubmitRequest,
    ) -> Result<(Vec<u8>, Option<String>), EngineError> {
        match &req.source {
            WorkflowSource::Inline(bytes) => Ok((bytes.clone(), None)),
            WorkflowSource::Named(name) => {
                let dir = self
                    .config
                    .workflows_dir
                    .as_ref()
                    .ok_or_else(|| EngineError::NotFound(format!("workflow '{name}'")))?;
                let path = find_workflow_file(dir, name)
                    .map_err(|_| EngineError::NotFound(format!("workflow '{name}'")))?;
                let bytes = std::fs::read(&path).map_err(|e| {
                    EngineError::Upstream(format!("failed to read workflow file: {e}"))
                })?;
                Ok((bytes, None))
            }
            WorkflowSource::Remote(reference) => {
                let parsed: RemoteRef = reference.parse().map_err(|e| {
                    EngineError::Validation(format!("invalid remote reference: {e}"))
                })?;
                let fetcher = self.fetcher.as_ref().ok_or_else(|| EngineError::Unavailable {
                    reason: "remote fetching not configured".to_string(),
                    retry_after: Duration::from_secs(10),
                })?;
                let fetched = fetcher
                    .fetch(&parsed, req.no_cache)
                    .await
                    .map_err(|e| EngineError::Upstream(format!("failed to fetch workflow: {e}")))?;
                Ok((fetched.bytes, Some(fetched.source_url)))
            }
        }
    }

    /// Append to the run log and fan out to subscribers.
    fn add_log(&self, run_id: &str, level: LogLevel, message: String, step_id: Option<String>) {
        if let Some(entry) = self.store.append_log(run_id, level, message, step_id) {
            self.logs.publish(run_id, &entry);
        }
    }

    async fn finalize(
        &self,
        run_id: &RunId,
        status: RunStatus,
        error: Option<String>,
    ) -> Option<RunSnapshot> {
        let now = self.store.clock().utc_now();
        self.store
            .update(run_id.as_str(), |run| run.finalize(status, error, now))
            .await
    }

    /// Contain worker panics: the run fails, the process stays up.
    async fn supervise(self: Arc<Self>, run_id: RunId) {
        let mgr = Arc::clone(&self);
        let id = run_id.clone();
        let worker = tokio::spawn(async move { mgr.execute_run(id).await });
        if let Err(join_err) = worker.await {
            if !join_err.is_panic() {
                return;
            }
            tracing::error!(run_id = %run_id, "run worker panicked");
            // A panic before admission leaves the pending gauge held
            let was_pending = self
                .store
                .get(run_id.as_str())
                .map(|s| s.status == RunStatus::Pending)
                .unwrap_or(false);
            if was_pending {
                self.metrics.dec_pending();
            }
            self.finalize(
                &run_id,
                RunStatus::Failed,
                Some("internal error: run worker panicked".to_string()),
            )
            .await;
            self.metrics.inc_failed();
            self.add_log(
                run_id.as_str(),
                LogLevel::Error,
                "Workflow failed: internal error".to_string(),
                None,
            );
        }
    }

    async fn execute_run(self: Arc<Self>, run_id: RunId) {
        let id = run_id.to_string();
        let Some(cancel) = self.store.cancel_token(&id) else {
            return;
        };
        let Some((def, workflow_hash)) = self.store.definition(&id) else {
            return;
        };

        // Admission: an execution slot, racing the cancellation signal
        let _permit = tokio::select! {
            permit = Arc::clone(&self.semaphore).acquire_owned() => {
                match permit {
                    Ok(permit) => permit,
                    // Semaphore closed: the process is going away
                    Err(_) => return,
                }
            }
            _ = cancel.cancelled() => {
                self.metrics.dec_pending();
                self.finalize(&run_id, RunStatus::Cancelled, Some("cancelled by user".to_string()))
                    .await;
                self.metrics.inc_cancelled();
                self.add_log(
                    &id,
                    LogLevel::Warn,
                    format!("Workflow cancelled before start: {}", def.name),
                    None,
                );
                return;
            }
        };

        self.metrics.dec_pending();
        let now = self.store.clock().utc_now();
        self.store.update(&id, |run| run.mark_running(now)).await;
        self.add_log(
            &id,
            LogLevel::Info,
            format!("Workflow started: {}", def.name),
            None,
        );

        // The whole-run deadline cancels the token like any other cancel
        let timed_out = Arc::new(AtomicBool::new(false));
        let timeout_task = self.config.run_timeout.map(|timeout| {
            let cancel = cancel.clone();
            let flag = Arc::clone(&timed_out);
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(timeout) => {
                        flag.store(true, Ordering::SeqCst);
                        cancel.cancel();
                    }
                    _ = cancel.cancelled() => {}
                }
            })
        });

        let log_id = id.clone();
        let mgr = Arc::clone(&self);
        let lifecycle_log = move |level: LogLevel, message: String| {
            mgr.add_log(&log_id, level, message, None);
        };

        // Tool servers start before the first step and always get stopped
        let mut server_names = Vec::new();
        if !def.tool_servers.is_empty() {
            match self
                .lifecycle
                .start_tool_servers(&cancel, &id, &def, &lifecycle_log)
                .await
            {
                Ok(names) => server_names = names,
                Err(e) => {
                    self.lifecycle
                        .stop_tool_servers(&e.started, &lifecycle_log)
                        .await;
                    if let Some(task) = timeout_task {
                        task.abort();
                    }
                    self.add_log(
                        &id,
                        LogLevel::Error,
                        format!("Workflow failed: {}", e.message),
                        None,
                    );
                    self.finalize(&run_id, RunStatus::Failed, Some(e.message)).await;
                    self.metrics.inc_failed();
                    return;
                }
            }
        }

        let inputs = self.store.get(&id).map(|s| s.inputs).unwrap_or_default();
        let observer = WorkerObserver {
            mgr: Arc::clone(&self),
            run_id: id.clone(),
            workflow_name: def.name.clone(),
            workflow_hash,
        };
        let result = run_steps(&cancel, self.executor.as_ref(), &def, inputs, &observer).await;

        if !server_names.is_empty() {
            self.lifecycle
                .stop_tool_servers(&server_names, &lifecycle_log)
                .await;
        }
        if let Some(task) = timeout_task {
            task.abort();
        }

        match result.error {
            None => {
                let output = result
                    .last_output
                    .as_ref()
                    .map(project_output)
                    .unwrap_or_default();
                self.store.update(&id, |run| run.output = output).await;
                self.finalize(&run_id, RunStatus::Completed, None).await;
                self.lifecycle.cleanup_checkpoint(&id).await;
                self.metrics.inc_completed();
                self.add_log(
                    &id,
                    LogLevel::Info,
                    format!("Workflow completed: {}", def.name),
                    None,
                );
            }
            Some(SequenceError::Cancelled) => {
                let message = if timed_out.load(Ordering::SeqCst) {
                    match self.config.run_timeout {
                        Some(timeout) => format!("run timed out after {}s", timeout.as_secs()),
                        None => "cancelled by user".to_string(),
                    }
                } else {
                    "cancelled by user".to_string()
                };
                self.finalize(&run_id, RunStatus::Cancelled, Some(message)).await;
                self.metrics.inc_cancelled();
                self.add_log(
                    &id,
                    LogLevel::Warn,
                    format!("Workflow cancelled: {}", def.name),
                    None,
                );
            }
            Some(SequenceError::StepFailed { step_id, message }) => {
                self.finalize(&run_id, RunStatus::Failed, Some(message.clone())).await;
                self.metrics.inc_failed();
                self.add_log(
                    &id,
                    LogLevel::Error,
                    format!("Workflow failed at step '{step_id}': {message}"),
                    None,
                );
            }
        }
    }
}

/// Observer wiring sequencer callbacks into the run's visible state.
struct WorkerObserver<C: Clock, G: IdGen + 'static> {
    mgr: Arc<RunManager<C, G>>,
    run_id: String,
    workflow_name: String,
    workflow_hash: String,
}

#[async_trait]
impl<C: Clock, G: IdGen + 'static> SequenceObserver for WorkerObserver<C, G> {
    async fn on_step_start(
        &self,
        step_id: &str,
        index: usize,
        total: usize,
        ctx: &WorkflowContext,
    ) {
        self.mgr
            .store
            .update(&self.run_id, |run| {
                run.progress.current_step_id = Some(step_id.to_string());
            })
            .await;
        self.mgr.add_log(
            &self.run_id,
            LogLevel::Info,
            format!("Step started: {step_id} ({}/{total})", index + 1),
            Some(step_id.to_string()),
        );
        // Checkpoint before the step executes, so recovery resumes here
        self.mgr
            .lifecycle
            .save_checkpoint(
                &self.run_id,
                &self.workflow_name,
                &self.workflow_hash,
                step_id,
                index,
                ctx,
            )
            .await;
    }

    async fn on_step_end(&self, step_id: &str, result: &StepResult) {
        match result.status {
            StepResultStatus::Success | StepResultStatus::Skipped => {
                self.mgr
                    .store
                    .update(&self.run_id, |run| {
                        if run.progress.completed < run.progress.total {
                            run.progress.completed += 1;
                        }
                    })
                    .await;
                let verb = if result.status == StepResultStatus::Skipped {
                    "skipped"
                } else {
                    "completed"
                };
                self.mgr.add_log(
                    &self.run_id,
                    LogLevel::Info,
                    format!("Step {verb}: {step_id}"),
                    Some(step_id.to_string()),
                );
            }
            StepResultStatus::Failed => {
                let error = result.error.as_deref().unwrap_or("step failed");
                self.mgr.add_log(
                    &self.run_id,
                    LogLevel::Error,
                    format!("Step failed: {step_id}: {error}"),
                    Some(step_id.to_string()),
                );
            }
        }
    }

    async fn on_log(&self, level: LogLevel, message: &str, step_id: Option<&str>) {
        self.mgr.add_log(
            &self.run_id,
            level,
            message.to_string(),
            step_id.map(String::from),
        );
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
