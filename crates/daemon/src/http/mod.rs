// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP control surface
//!
//! Thin handlers over the run manager: submit, get, list, cancel, output,
//! log streaming, per-workflow public triggers, health, and metrics.

mod error;
mod runs;
mod stream;
mod trigger;

pub use error::ApiError;

use crate::DaemonRunManager;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Maximum body size for the public trigger route (1 MiB).
pub const MAX_TRIGGER_BODY: usize = 1024 * 1024;

/// Shared state of the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<DaemonRunManager>,
    pub workflows_dir: Option<PathBuf>,
    pub started_at: Instant,
}

/// Build the daemon router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .route("/v1/runs", post(runs::submit).get(runs::list))
        .route("/v1/runs/{id}", get(runs::get_run).delete(runs::cancel))
        .route("/v1/runs/{id}/output", get(runs::output))
        .route("/v1/runs/{id}/logs", get(stream::logs))
        .route(
            "/v1/start/{workflow}",
            post(trigger::start).layer(DefaultBodyLimit::max(MAX_TRIGGER_BODY)),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": if state.runner.is_draining() { "draining" } else { "ok" },
        "active_runs": state.runner.active_run_count(),
    }))
}

async fn metrics(State(state): State<AppState>) -> String {
    crate::metrics::render(
        &state.runner.metrics().snapshot(),
        state.runner.active_run_count(),
        state.started_at.elapsed().as_secs(),
    )
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
