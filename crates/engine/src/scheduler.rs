// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron scheduler: tick-driven triggering of due schedules.

use crate::metrics::EngineMetrics;
use crate::runner::{RunManager, SubmitRequest};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use skein_core::{Clock, IdGen, RunIdGen, SystemClock};
use skein_storage::{Backend, ScheduleState};
use skein_workflow::ScheduleDef;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Tick cadence of the scheduler loop.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

struct ScheduleEntry {
    def: ScheduleDef,
    next_run_at: Option<DateTime<Utc>>,
    last_run_at: Option<DateTime<Utc>>,
    run_count: u64,
    error_count: u64,
}

/// Observable state of one schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleStatus {
    pub name: String,
    pub enabled: bool,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub error_count: u64,
}

/// Fires enabled schedules whose next fire time has passed.
///
/// A single task ticks at 1 Hz; due schedules are collected under the
/// table lock and fired outside it.
pub struct CronScheduler<C: Clock = SystemClock, G: IdGen + 'static = RunIdGen> {
    runner: Arc<RunManager<C, G>>,
    backend: Arc<dyn Backend>,
    schedules: Mutex<HashMap<String, ScheduleEntry>>,
    metrics: Arc<EngineMetrics>,
    clock: C,
}

impl<C: Clock, G: IdGen + 'static> CronScheduler<C, G> {
    pub fn new(
        runner: Arc<RunManager<C, G>>,
        backend: Arc<dyn Backend>,
        metrics: Arc<EngineMetrics>,
        clock: C,
    ) -> Self {
        Self {
            runner,
            backend,
            schedules: Mutex::new(HashMap::new()),
            metrics,
            clock,
        }
    }

    /// Add schedules, hydrating persisted counters and computing the
    /// first fire time. Invalid cron expressions are rejected with a
    /// warning rather than poisoning the table.
    pub async fn load(&self, defs: Vec<ScheduleDef>) {
        let now = self.clock.utc_now();
        for def in defs {
            let next_run_at = match def.next_fire(now) {
                Ok(next) => next,
                Err(e) => {
                    tracing::warn!(schedule = %def.name, error = %e, "skipping invalid schedule");
                    continue;
                }
            };

            let persisted = match self.backend.get_schedule_state(&def.name).await {
                Ok(state) => state.unwrap_or_default(),
                Err(e) => {
                    tracing::warn!(schedule = %def.name, error = %e, "schedule state load failed");
                    ScheduleState::default()
                }
            };

            tracing::info!(
                schedule = %def.name,
                workflow = %def.workflow,
                next = ?next_run_at,
                "schedule loaded"
            );
            self.schedules.lock().insert(
                def.name.clone(),
                ScheduleEntry {
                    def,
                    next_run_at,
                    last_run_at: persisted.last_run_at,
                    run_count: persisted.run_count,
                    error_count: persisted.error_count,
                },
            );
        }
    }

    /// Remove a schedule by name.
    pub fn remove(&self, name: &str) -> bool {
        self.schedules.lock().remove(name).is_some()
    }

    /// Observable state of one schedule.
    pub fn status(&self, name: &str) -> Option<ScheduleStatus> {
        self.schedules.lock().get(name).map(|entry| ScheduleStatus {
            name: entry.def.name.clone(),
            enabled: entry.def.enabled,
            next_run_at: entry.next_run_at,
            last_run_at: entry.last_run_at,
            run_count: entry.run_count,
            error_count: entry.error_count,
        })
    }

    /// Run the tick loop until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(self.clock.utc_now()).await;
                }
                _ = cancel.cancelled() => {
                    tracing::info!("scheduler stopped");
                    return;
                }
            }
        }
    }

    /// Fire every enabled schedule that is due at `now`.
    pub async fn tick(&self, now: DateTime<Utc>) {
        // Collect due names under the lock; fire outside it
        let due: Vec<String> = {
            let schedules = self.schedules.lock();
            schedules
                .values()
                .filter(|entry| {
                    entry.def.enabled
                        && entry.next_run_at.map(|next| next <= now).unwrap_or(false)
                })
                .map(|entry| entry.def.name.clone())
                .collect()
        };

        for name in due {
            self.fire(&name, now).await;
        }
    }

    async fn fire(&self, name: &str, now: DateTime<Utc>) {
        let def = {
            let schedules = self.schedules.lock();
            match schedules.get(name) {
                Some(entry) => entry.def.clone(),
                None => return,
            }
        };

        if self.runner.is_draining() {
            // Leave next_run_at untouched so the schedule fires on the
            // first tick after drain ends
            tracing::info!(schedule = %name, "skipping schedule fire while draining");
            return;
        }

        let mut inputs: Map<String, Value> = def.inputs.clone();
        inputs.insert("_scheduled".to_string(), json!(true));
        inputs.insert("_schedule_name".to_string(), json!(name));

        let submit = self
            .runner
            .submit(SubmitRequest::named(&def.workflow).with_inputs(inputs))
            .await;

        let fired_ok = match submit {
            Ok(snapshot) => {
                tracing::info!(schedule = %name, run_id = %snapshot.id, "schedule fired");
                self.metrics.inc_schedule_fires();
                true
            }
            Err(e) => {
                tracing::warn!(schedule = %name, error = %e, "schedule fire failed");
                self.metrics.inc_schedule_errors();
                false
            }
        };

        // Advance past `now` whether the fire worked or not, so a broken
        // workflow cannot hot-loop every tick
        let state = {
            let mut schedules = self.schedules.lock();
            let Some(entry) = schedules.get_mut(name) else {
                return;
            };
            entry.next_run_at = entry.def.next_fire(now).ok().flatten();
            if fired_ok {
                entry.run_count += 1;
                entry.last_run_at = Some(now);
            } else {
                entry.error_count += 1;
            }
            ScheduleState {
                last_run_at: entry.last_run_at,
                run_count: entry.run_count,
                error_count: entry.error_count,
            }
        };

        if let Err(e) = self.backend.save_schedule_state(name, &state).await {
            tracing::warn!(schedule = %name, error = %e, "schedule state save failed");
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
