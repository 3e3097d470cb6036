// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log fan-out to live subscribers.
//!
//! Producers must never block on a slow consumer: every subscriber gets a
//! bounded channel and entries are dropped on the floor once it fills.
//! The only observable effect of a slow subscriber is its own missing
//! entries.

use parking_lot::Mutex;
use skein_core::LogEntry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Per-subscriber channel capacity.
pub const SUBSCRIBER_BUFFER: usize = 100;

type SubscriberTable = Arc<Mutex<HashMap<String, Vec<SubscriberEntry>>>>;

struct SubscriberEntry {
    id: u64,
    tx: mpsc::Sender<LogEntry>,
}

/// Multicasts run log entries to live subscribers.
#[derive(Default)]
pub struct LogAggregator {
    subscribers: SubscriberTable,
    next_id: AtomicU64,
}

impl LogAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a run's future log entries.
    ///
    /// Dropping (or explicitly unsubscribing) the returned [`Subscription`]
    /// removes the channel from the table and closes it.
    pub fn subscribe(&self, run_id: &str) -> (mpsc::Receiver<LogEntry>, Subscription) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .entry(run_id.to_string())
            .or_default()
            .push(SubscriberEntry { id, tx });
        (
            rx,
            Subscription {
                table: Arc::clone(&self.subscribers),
                run_id: run_id.to_string(),
                id,
            },
        )
    }

    /// Fan an entry out to every subscriber of the run.
    ///
    /// Non-blocking: a full channel drops the entry for that subscriber.
    pub fn publish(&self, run_id: &str, entry: &LogEntry) {
        let subscribers = self.subscribers.lock();
        let Some(entries) = subscribers.get(run_id) else {
            return;
        };
        for subscriber in entries {
            if let Err(mpsc::error::TrySendError::Full(_)) =
                subscriber.tx.try_send(entry.clone())
            {
                tracing::debug!(
                    run_id,
                    subscriber = subscriber.id,
                    "dropping log entry for slow subscriber"
                );
            }
        }
    }

    /// Number of live subscribers for a run.
    pub fn subscriber_count(&self, run_id: &str) -> usize {
        self.subscribers
            .lock()
            .get(run_id)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

/// Handle that removes its channel from the fan-out table when dropped.
///
/// The entry is taken out of the active set under the table lock before
/// the sender is dropped, so no publisher can race a send against the
/// close.
pub struct Subscription {
    table: SubscriberTable,
    run_id: String,
    id: u64,
}

impl Subscription {
    /// Explicit unsubscribe; equivalent to dropping.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut table = self.table.lock();
        if let Some(entries) = table.get_mut(&self.run_id) {
            entries.retain(|e| e.id != self.id);
            if entries.is_empty() {
                table.remove(&self.run_id);
            }
        }
    }
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
