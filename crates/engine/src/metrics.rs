// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine counters surfaced by the daemon's metrics endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide run and scheduler counters.
///
/// Plain atomics; the daemon renders them in Prometheus text format.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    runs_submitted: AtomicU64,
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    runs_cancelled: AtomicU64,
    /// Runs waiting on an execution slot
    runs_pending: AtomicU64,
    schedule_fires: AtomicU64,
    schedule_errors: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub runs_submitted: u64,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub runs_cancelled: u64,
    pub runs_pending: u64,
    pub schedule_fires: u64,
    pub schedule_errors: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_submitted(&self) {
        self.runs_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_completed(&self) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cancelled(&self) {
        self.runs_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_pending(&self) {
        self.runs_pending.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_pending(&self) {
        // Saturating: a double-release must never wrap the gauge
        let _ = self
            .runs_pending
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }

    pub fn inc_schedule_fires(&self) {
        self.schedule_fires.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_schedule_errors(&self) {
        self.schedule_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_submitted: self.runs_submitted.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            runs_cancelled: self.runs_cancelled.load(Ordering::Relaxed),
            runs_pending: self.runs_pending.load(Ordering::Relaxed),
            schedule_fires: self.schedule_fires.load(Ordering::Relaxed),
            schedule_errors: self.schedule_errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
