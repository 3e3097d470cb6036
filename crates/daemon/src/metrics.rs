// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prometheus text rendering of engine counters.

use skein_engine::MetricsSnapshot;
use std::fmt::Write;

/// Render the engine counters in Prometheus exposition format.
pub fn render(snapshot: &MetricsSnapshot, active_runs: usize, uptime_seconds: u64) -> String {
    let mut out = String::new();
    let mut counter = |name: &str, help: &str, value: u64| {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} counter");
        let _ = writeln!(out, "{name} {value}");
    };

    counter(
        "skein_runs_submitted_total",
        "Runs accepted by the daemon",
        snapshot.runs_submitted,
    );
    counter(
        "skein_runs_completed_total",
        "Runs that finished successfully",
        snapshot.runs_completed,
    );
    counter(
        "skein_runs_failed_total",
        "Runs that terminated in failure",
        snapshot.runs_failed,
    );
    counter(
        "skein_runs_cancelled_total",
        "Runs cancelled by callers or timeouts",
        snapshot.runs_cancelled,
    );
    counter(
        "skein_schedule_fires_total",
        "Cron schedule fires",
        snapshot.schedule_fires,
    );
    counter(
        "skein_schedule_errors_total",
        "Cron schedule fire failures",
        snapshot.schedule_errors,
    );

    let mut gauge = |name: &str, help: &str, value: u64| {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} gauge");
        let _ = writeln!(out, "{name} {value}");
    };
    gauge(
        "skein_runs_pending",
        "Runs waiting for an execution slot",
        snapshot.runs_pending,
    );
    gauge(
        "skein_runs_active",
        "Runs pending or running",
        active_runs as u64,
    );
    gauge("skein_uptime_seconds", "Daemon uptime", uptime_seconds);

    out
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
