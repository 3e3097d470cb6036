// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers

use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Default timeout for workflow shell step commands.
/// Set to 10 minutes as a safety net for long-running user scripts.
pub const SHELL_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// Default startup timeout for tool-server subprocesses.
pub const TOOL_SERVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a subprocess produced no output.
#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("{description} failed: {source}")]
    Io {
        description: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{description} timed out after {}s", .timeout.as_secs())]
    TimedOut {
        description: String,
        timeout: Duration,
    },
    #[error("{description} cancelled")]
    Cancelled { description: String },
}

/// Run a subprocess command to completion, bounded by a deadline and the
/// caller's cancellation token.
///
/// Whichever loses the race is reported as a typed error; the child is
/// reaped on drop when the caller sets `kill_on_drop` (and `output()`
/// enables it by default).
pub async fn run_with_timeout(
    cancel: &CancellationToken,
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, SubprocessError> {
    tokio::select! {
        result = cmd.output() => result.map_err(|source| SubprocessError::Io {
            description: description.to_string(),
            source,
        }),
        _ = cancel.cancelled() => Err(SubprocessError::Cancelled {
            description: description.to_string(),
        }),
        _ = tokio::time::sleep(timeout) => Err(SubprocessError::TimedOut {
            description: description.to_string(),
            timeout,
        }),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
