// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory run state store.
//!
//! The store exclusively owns the `run id → run` mapping. A single
//! reader-writer lock guards the map and each run's mutable fields:
//! snapshot reads take the read lock, execution mutations take the write
//! lock, and the lock is never held across backend I/O. The backend only
//! sees a best-effort projection; in-memory state stays authoritative.

use crate::runner::CancelOutcome;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use skein_core::{
    Clock, IdGen, LogEntry, LogLevel, Run, RunConfig, RunFilter, RunId, RunIdGen, RunSnapshot,
    SystemClock,
};
use skein_storage::{Backend, RunRecord};
use skein_workflow::WorkflowDef;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct RunHandle {
    run: Run,
    definition: Arc<WorkflowDef>,
    workflow_hash: String,
    cancel: CancellationToken,
    cancel_requested: Arc<AtomicBool>,
}

/// A freshly created run, as handed to the submitting caller.
pub struct CreatedRun {
    pub snapshot: RunSnapshot,
    pub cancel: CancellationToken,
}

/// Owns all runs for the lifetime of the process (no eviction policy;
/// state is reset by restart).
pub struct StateStore<C: Clock = SystemClock, G: IdGen = RunIdGen> {
    runs: RwLock<HashMap<String, RunHandle>>,
    backend: Arc<dyn Backend>,
    clock: C,
    ids: G,
}

impl<C: Clock, G: IdGen> StateStore<C, G> {
    pub fn new(backend: Arc<dyn Backend>, clock: C, ids: G) -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            backend,
            clock,
            ids,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Create a run in pending state and persist its projection.
    pub async fn create_run(
        &self,
        definition: Arc<WorkflowDef>,
        workflow_hash: String,
        inputs: Map<String, Value>,
        source_url: Option<String>,
        correlation_id: Option<String>,
    ) -> CreatedRun {
        let id = RunId::new(self.ids.next());
        let correlation_id = correlation_id.unwrap_or_else(|| id.to_string());
        let run = Run::new(
            id.clone(),
            RunConfig {
                workflow_name: definition.name.clone(),
                correlation_id,
                inputs,
                source_url,
                total_steps: definition.steps.len(),
            },
            self.clock.utc_now(),
        );
        let record = RunRecord::from_run(&run);
        let snapshot = run.snapshot();
        let cancel = CancellationToken::new();

        self.runs.write().insert(
            id.to_string(),
            RunHandle {
                run,
                definition,
                workflow_hash,
                cancel: cancel.clone(),
                cancel_requested: Arc::new(AtomicBool::new(false)),
            },
        );

        if let Err(e) = self.backend.create_run(&record).await {
            tracing::warn!(run_id = %id, error = %e, "backend create failed; in-memory state remains authoritative");
        }

        CreatedRun { snapshot, cancel }
    }

    /// Point-in-time snapshot of a run.
    pub fn get(&self, id: &str) -> Option<RunSnapshot> {
        self.runs.read().get(id).map(|h| h.run.snapshot())
    }

    /// Snapshots of all runs passing the filter. Order is unspecified.
    pub fn list(&self, filter: &RunFilter) -> Vec<RunSnapshot> {
        let runs = self.runs.read();
        let mut matched: Vec<RunSnapshot> = runs
            .values()
            .filter(|h| filter.matches(&h.run))
            .map(|h| h.run.snapshot())
            .collect();
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        matched
    }

    /// Runs that hold (or are waiting for) an execution slot.
    pub fn active_count(&self) -> usize {
        self.runs
            .read()
            .values()
            .filter(|h| h.run.status.is_active())
            .count()
    }

    /// The parsed definition and content hash backing a run.
    pub fn definition(&self, id: &str) -> Option<(Arc<WorkflowDef>, String)> {
        self.runs
            .read()
            .get(id)
            .map(|h| (Arc::clone(&h.definition), h.workflow_hash.clone()))
    }

    /// The run's cancellation token.
    pub fn cancel_token(&self, id: &str) -> Option<CancellationToken> {
        self.runs.read().get(id).map(|h| h.cancel.clone())
    }

    /// Request cancellation.
    ///
    /// Idempotent: the token is cancelled at most once (guarded by a
    /// swap), and any number of concurrent calls settle on one outcome.
    /// Returns `None` for unknown runs.
    pub fn cancel(&self, id: &str) -> Option<CancelOutcome> {
        let runs = self.runs.read();
        let handle = runs.get(id)?;

        // Cancel after termination is a no-op; callers see the single
        // terminal outcome forever after
        if handle.run.is_terminal() {
            return Some(CancelOutcome::AlreadyTerminal(handle.run.status));
        }
        if !handle.cancel_requested.swap(true, Ordering::SeqCst) {
            handle.cancel.cancel();
        }
        Some(CancelOutcome::Delivered)
    }

    /// Mutate a run under the write lock, then persist the projection.
    ///
    /// The worker that owns the run is the only caller once execution has
    /// started; everyone else reads snapshots.
    pub async fn update<F>(&self, id: &str, mutate: F) -> Option<RunSnapshot>
    where
        F: FnOnce(&mut Run),
    {
        let (snapshot, record) = {
            let mut runs = self.runs.write();
            let handle = runs.get_mut(id)?;
            mutate(&mut handle.run);
            (handle.run.snapshot(), RunRecord::from_run(&handle.run))
        };

        if let Err(e) = self.backend.update_run(&record).await {
            tracing::warn!(run_id = %id, error = %e, "backend update failed; in-memory state remains authoritative");
        }
        Some(snapshot)
    }

    /// Append a log entry to a run, stamping time and correlation id.
    ///
    /// Logs are best-effort in-memory state and are not written to the
    /// backend.
    pub fn append_log(
        &self,
        id: &str,
        level: LogLevel,
        message: impl Into<String>,
        step_id: Option<String>,
    ) -> Option<LogEntry> {
        let mut runs = self.runs.write();
        let handle = runs.get_mut(id)?;
        let entry = LogEntry {
            timestamp: self.clock.utc_now(),
            level,
            message: message.into(),
            step_id,
            correlation_id: Some(handle.run.correlation_id.clone()),
        };
        handle.run.push_log(entry.clone());
        Some(entry)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
