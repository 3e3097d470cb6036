// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! skein daemon library: configuration, startup, and the HTTP control
//! surface.

pub mod config;
pub mod env;
pub mod http;
pub mod lifecycle;
pub mod metrics;

pub use config::DaemonConfig;
pub use http::AppState;
pub use lifecycle::{LifecycleError, StartupResult};

use skein_core::{RunIdGen, SystemClock};

/// Run manager with the daemon's concrete clock and id generator.
pub type DaemonRunManager = skein_engine::RunManager<SystemClock, RunIdGen>;
/// Scheduler with the daemon's concrete types.
pub type DaemonScheduler = skein_engine::CronScheduler<SystemClock, RunIdGen>;
