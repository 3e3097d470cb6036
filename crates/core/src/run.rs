// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run identifier and state machine.

use crate::id::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, waiting for an execution slot
    Pending,
    /// Steps are executing
    Running,
    /// All steps finished successfully
    Completed,
    /// A step failed (or the worker hit an internal error)
    Failed,
    /// Cancelled by a caller or by timeout
    Cancelled,
    /// Validated but never executed
    DryRun,
}

impl RunStatus {
    /// Check if this status is terminal (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled | RunStatus::DryRun
        )
    }

    /// Check if the run still occupies (or will occupy) an execution slot.
    pub fn is_active(&self) -> bool {
        matches!(self, RunStatus::Pending | RunStatus::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Cancelled => write!(f, "cancelled"),
            RunStatus::DryRun => write!(f, "dry_run"),
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RunStatus::Pending),
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            "cancelled" => Ok(RunStatus::Cancelled),
            "dry_run" => Ok(RunStatus::DryRun),
            other => Err(format!("unknown run status: {other}")),
        }
    }
}

/// Severity of a run log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// One entry in a run's append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

/// Step progress through a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Step currently executing (or about to), if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step_id: Option<String>,
    /// Steps finished so far
    pub completed: usize,
    /// Total steps in the workflow
    pub total: usize,
}

/// Configuration for creating a new run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub workflow_name: String,
    pub correlation_id: String,
    pub inputs: Map<String, Value>,
    pub source_url: Option<String>,
    pub total_steps: usize,
}

/// A workflow run instance.
///
/// Mutable fields are only touched by the worker that owns the run (via the
/// state store's write lock); everything external reads a [`RunSnapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub workflow_name: String,
    pub status: RunStatus,
    pub correlation_id: String,
    pub inputs: Map<String, Value>,
    pub output: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub progress: Progress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl Run {
    /// Create a new run in pending state.
    pub fn new(id: RunId, config: RunConfig, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            workflow_name: config.workflow_name,
            status: RunStatus::Pending,
            correlation_id: config.correlation_id,
            inputs: config.inputs,
            output: Map::new(),
            error: None,
            progress: Progress {
                current_step_id: None,
                completed: 0,
                total: config.total_steps,
            },
            source_url: config.source_url,
            created_at,
            started_at: None,
            completed_at: None,
            logs: Vec::new(),
        }
    }

    /// Check if the run is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Transition pending → running and stamp the start time.
    ///
    /// No-op once the run has left pending (a cancel can win the race).
    pub fn mark_running(&mut self, now: DateTime<Utc>) {
        if self.status == RunStatus::Pending {
            self.status = RunStatus::Running;
            self.started_at = Some(now);
        }
    }

    /// Transition to a terminal status and stamp the completion time.
    ///
    /// First terminal transition wins; later calls are ignored so concurrent
    /// cancel/complete races leave a single stable outcome.
    pub fn finalize(&mut self, status: RunStatus, error: Option<String>, now: DateTime<Utc>) {
        if self.is_terminal() {
            return;
        }
        self.status = status;
        self.error = error;
        self.completed_at = Some(now);
    }

    /// Append a log entry.
    pub fn push_log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }

    /// Produce an owned, point-in-time copy for external readers.
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            id: self.id.clone(),
            workflow_name: self.workflow_name.clone(),
            status: self.status,
            correlation_id: self.correlation_id.clone(),
            inputs: self.inputs.clone(),
            output: self.output.clone(),
            error: self.error.clone(),
            progress: self.progress.clone(),
            source_url: self.source_url.clone(),
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            logs: self.logs.clone(),
        }
    }
}

/// Deep, immutable copy of a [`Run`] used for all external reads.
///
/// Owns every container it carries; mutating a snapshot can never be
/// observed through the run or through another snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub id: RunId,
    pub workflow_name: String,
    pub status: RunStatus,
    pub correlation_id: String,
    pub inputs: Map<String, Value>,
    pub output: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub progress: Progress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

/// Filter for listing runs.
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub status: Option<RunStatus>,
    pub workflow_name: Option<String>,
    pub limit: Option<usize>,
}

impl RunFilter {
    /// Check whether a run passes the status/name predicates (limit is
    /// applied by the caller).
    pub fn matches(&self, run: &Run) -> bool {
        if let Some(status) = self.status {
            if run.status != status {
                return false;
            }
        }
        if let Some(name) = &self.workflow_name {
            if &run.workflow_name != name {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
