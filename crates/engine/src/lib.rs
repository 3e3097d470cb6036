// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! skein-engine: the run execution engine
//!
//! Takes parsed workflow definitions plus inputs and drives them to
//! completion: bounded concurrent execution, per-run cancellation, step
//! sequencing, tool-server lifecycle, log fan-out, checkpointing, cron
//! scheduling, and graceful drain.

mod error;
mod lifecycle;
mod logs;
mod metrics;
mod output;
mod runner;
mod scheduler;
mod sequencer;
mod state;
mod tools;

pub use error::EngineError;
pub use lifecycle::{LifecycleManager, ToolServerStartError};
pub use logs::{LogAggregator, Subscription, SUBSCRIBER_BUFFER};
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use output::{project_output, OutputMetadata, StepOutput};
pub use runner::{
    CancelOutcome, RunManager, RunManagerConfig, SubmitRequest, WorkflowSource,
    DEFAULT_MAX_PARALLEL,
};
pub use scheduler::{CronScheduler, ScheduleStatus};
pub use sequencer::{
    run_steps, ExecutionResult, NoopObserver, SequenceError, SequenceObserver,
};
pub use state::{CreatedRun, StateStore};
pub use tools::ToolRegistry;
