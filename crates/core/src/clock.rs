// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstractions

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of time for the engine.
///
/// Monotonic time (`now`) drives durations and deadlines; wall-clock time
/// (`utc_now`, `epoch_ms`) stamps records that leave the process.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic instant.
    fn now(&self) -> Instant;

    /// Wall-clock time in UTC.
    fn utc_now(&self) -> DateTime<Utc>;

    /// Milliseconds since the Unix epoch.
    fn epoch_ms(&self) -> u64 {
        self.utc_now().timestamp_millis().max(0) as u64
    }
}

/// Production clock backed by the system time sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Controllable clock for deterministic tests.
#[derive(Debug, Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockInner>>,
}

#[derive(Debug)]
struct FakeClockInner {
    now: Instant,
    utc: DateTime<Utc>,
}

impl FakeClock {
    /// Create a fake clock anchored at the current instant and epoch zero.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClockInner {
                now: Instant::now(),
                utc: Utc.timestamp_millis_opt(0).single().unwrap_or_default(),
            })),
        }
    }

    /// Advance both monotonic and wall-clock time.
    pub fn advance(&self, d: Duration) {
        let mut inner = self.inner.lock();
        inner.now += d;
        inner.utc += chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::zero());
    }

    /// Set the wall clock to a specific UTC time.
    pub fn set_utc(&self, utc: DateTime<Utc>) {
        self.inner.lock().utc = utc;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().now
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.inner.lock().utc
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
