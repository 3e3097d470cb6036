// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable backend trait and the persisted run projection.

use crate::checkpoint::RunCheckpoint;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use skein_core::{Run, RunFilter, RunStatus};
use thiserror::Error;

/// Errors from backend operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("run not found: {0}")]
    NotFound(String),
    #[error("backend closed")]
    Closed,
}

/// The persisted shape of a run.
///
/// Logs are deliberately absent: they are best-effort in-memory state and
/// never durable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub workflow_name: String,
    pub status: String,
    pub correlation_id: String,
    pub inputs: Map<String, Value>,
    pub output: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    pub completed: usize,
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RunRecord {
    /// Project a run into its persisted shape.
    pub fn from_run(run: &Run) -> Self {
        Self {
            id: run.id.to_string(),
            workflow_name: run.workflow_name.clone(),
            status: run.status.to_string(),
            correlation_id: run.correlation_id.clone(),
            inputs: run.inputs.clone(),
            output: run.output.clone(),
            error: run.error.clone(),
            current_step: run.progress.current_step_id.clone(),
            completed: run.progress.completed,
            total: run.progress.total,
            started_at: run.started_at,
            completed_at: run.completed_at,
            created_at: run.created_at,
        }
    }

    /// Parse the stored status string.
    pub fn status(&self) -> Option<RunStatus> {
        self.status.parse().ok()
    }
}

/// Persisted scheduler bookkeeping for one schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub error_count: u64,
}

/// Durable store for run projections and scheduler state.
///
/// All writes are best-effort from the engine's point of view: in-memory
/// state stays authoritative and backend failures are logged, not
/// propagated into run outcomes.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn create_run(&self, record: &RunRecord) -> Result<(), StorageError>;
    async fn update_run(&self, record: &RunRecord) -> Result<(), StorageError>;
    async fn get_run(&self, id: &str) -> Result<RunRecord, StorageError>;
    async fn list_runs(&self, filter: &RunFilter) -> Result<Vec<RunRecord>, StorageError>;
    async fn delete_run(&self, id: &str) -> Result<(), StorageError>;

    async fn save_checkpoint(&self, checkpoint: &RunCheckpoint) -> Result<(), StorageError>;
    async fn get_checkpoint(&self, run_id: &str) -> Result<Option<RunCheckpoint>, StorageError>;

    async fn save_schedule_state(
        &self,
        name: &str,
        state: &ScheduleState,
    ) -> Result<(), StorageError>;
    async fn get_schedule_state(&self, name: &str) -> Result<Option<ScheduleState>, StorageError>;

    async fn close(&self) -> Result<(), StorageError>;
}

/// Check a record against a listing filter.
pub(crate) fn record_matches(record: &RunRecord, filter: &RunFilter) -> bool {
    if let Some(status) = filter.status {
        if record.status() != Some(status) {
            return false;
        }
    }
    if let Some(name) = &filter.workflow_name {
        if &record.workflow_name != name {
            return false;
        }
    }
    true
}
