// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for external I/O

pub mod fetch;
pub mod step;
pub mod subprocess;
pub mod toolserver;

pub use fetch::{FetchError, FetchedWorkflow, Fetcher, GithubFetcher};
pub use step::{ShellStepExecutor, StepExecutor, StepExecutorError, StepResult, StepResultStatus};
pub use toolserver::{
    ProcessToolServerManager, ToolClient, ToolDefinition, ToolServerConfig, ToolServerError,
    ToolServerManager, ToolServerStatus,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fetch::FakeFetcher;
#[cfg(any(test, feature = "test-support"))]
pub use step::{FakeStepExecutor, ScriptedResult};
#[cfg(any(test, feature = "test-support"))]
pub use toolserver::{FakeToolServerManager, ToolServerCall};
