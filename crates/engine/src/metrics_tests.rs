// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn counters_accumulate() {
    let metrics = EngineMetrics::new();
    metrics.inc_submitted();
    metrics.inc_submitted();
    metrics.inc_completed();
    metrics.inc_failed();
    metrics.inc_cancelled();
    metrics.inc_schedule_fires();
    metrics.inc_schedule_errors();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.runs_submitted, 2);
    assert_eq!(snapshot.runs_completed, 1);
    assert_eq!(snapshot.runs_failed, 1);
    assert_eq!(snapshot.runs_cancelled, 1);
    assert_eq!(snapshot.schedule_fires, 1);
    assert_eq!(snapshot.schedule_errors, 1);
}

#[test]
fn pending_gauge_rises_and_falls() {
    let metrics = EngineMetrics::new();
    metrics.inc_pending();
    metrics.inc_pending();
    assert_eq!(metrics.snapshot().runs_pending, 2);

    metrics.dec_pending();
    assert_eq!(metrics.snapshot().runs_pending, 1);
}

#[test]
fn pending_gauge_never_underflows() {
    let metrics = EngineMetrics::new();
    metrics.dec_pending();
    metrics.dec_pending();
    assert_eq!(metrics.snapshot().runs_pending, 0);
}
