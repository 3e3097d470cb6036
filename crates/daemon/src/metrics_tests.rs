// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn renders_counters_and_gauges() {
    let snapshot = MetricsSnapshot {
        runs_submitted: 7,
        runs_completed: 4,
        runs_failed: 1,
        runs_cancelled: 2,
        runs_pending: 3,
        schedule_fires: 5,
        schedule_errors: 0,
    };
    let text = render(&snapshot, 6, 120);

    assert!(text.contains("# TYPE skein_runs_submitted_total counter"));
    assert!(text.contains("skein_runs_submitted_total 7"));
    assert!(text.contains("skein_runs_completed_total 4"));
    assert!(text.contains("skein_runs_failed_total 1"));
    assert!(text.contains("skein_runs_cancelled_total 2"));
    assert!(text.contains("# TYPE skein_runs_pending gauge"));
    assert!(text.contains("skein_runs_pending 3"));
    assert!(text.contains("skein_runs_active 6"));
    assert!(text.contains("skein_uptime_seconds 120"));
    assert!(text.contains("skein_schedule_fires_total 5"));
}

#[test]
fn every_metric_has_help_line() {
    let text = render(&MetricsSnapshot::default(), 0, 0);
    for line in text.lines().filter(|l| !l.starts_with('#')) {
        let name = line.split_whitespace().next().unwrap();
        assert!(
            text.contains(&format!("# HELP {name} ")),
            "missing HELP for {name}"
        );
    }
}
