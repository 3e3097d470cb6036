// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error kinds

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the run engine.
///
/// Each variant maps to one disposition at the control surface; internal
/// background failures (backend writes, dropped log entries) are logged
/// and swallowed rather than surfaced here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Unparseable workflow, unsupported content, missing required field
    #[error("{0}")]
    Validation(String),

    /// Unknown run, workflow, or schedule
    #[error("{0} not found")]
    NotFound(String),

    /// Operation does not apply to the entity's current state
    #[error("{0}")]
    Conflict(String),

    /// Daemon is draining or a required collaborator is not configured
    #[error("unavailable: {reason}")]
    Unavailable { reason: String, retry_after: Duration },

    /// A collaborator (remote fetch, tool server) failed
    #[error("{0}")]
    Upstream(String),

    /// Context cancellation observed by the worker
    #[error("cancelled by user")]
    Cancelled,

    /// A step's executor reported failure
    #[error("{0}")]
    StepFailure(String),

    /// Recovered panic or other engine defect
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Unavailable-while-draining with the standard retry hint.
    pub fn draining() -> Self {
        EngineError::Unavailable {
            reason: "daemon is draining".to_string(),
            retry_after: Duration::from_secs(10),
        }
    }
}
