// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run log streaming (JSON or SSE).

use super::error::ApiError;
use super::AppState;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use skein_core::LogEntry;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// How often the forwarder re-checks for terminal status.
const TERMINAL_POLL_INTERVAL: Duration = Duration::from_millis(250);

fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("text/event-stream"))
        .unwrap_or(false)
}

fn log_event(entry: &LogEntry) -> Event {
    let data = serde_json::to_string(entry).unwrap_or_else(|_| "{}".to_string());
    Event::default().event("log").data(data)
}

/// GET /v1/runs/{id}/logs
///
/// With `Accept: text/event-stream`: replay the logs accumulated so far,
/// then follow live entries, ending with a `done` event once the run is
/// terminal. Otherwise: the accumulated logs as JSON.
pub async fn logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let snapshot = state.runner.get(&id)?;

    if !wants_event_stream(&headers) {
        return Ok(Json(json!({ "logs": snapshot.logs })).into_response());
    }

    let (live_rx, subscription) = state.runner.subscribe(&id)?;
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(64);
    let runner = state.runner.clone();

    tokio::spawn(async move {
        // Keep the subscription alive for the life of the forwarder
        let _subscription = subscription;
        let mut live_rx = live_rx;

        // Existing entries first, in order
        for entry in &snapshot.logs {
            if tx.send(Ok(log_event(entry))).await.is_err() {
                return;
            }
        }

        let mut poll = tokio::time::interval(TERMINAL_POLL_INTERVAL);
        loop {
            tokio::select! {
                maybe_entry = live_rx.recv() => {
                    match maybe_entry {
                        Some(entry) => {
                            if tx.send(Ok(log_event(&entry))).await.is_err() {
                                return;
                            }
                        }
                        None => break,
                    }
                }
                _ = poll.tick() => {
                    let Some(current) = runner.get(&id).ok() else { break };
                    if current.status.is_terminal() {
                        // Flush anything the subscriber already buffered
                        while let Ok(entry) = live_rx.try_recv() {
                            if tx.send(Ok(log_event(&entry))).await.is_err() {
                                return;
                            }
                        }
                        let done = Event::default()
                            .event("done")
                            .data(json!({ "status": current.status }).to_string());
                        let _ = tx.send(Ok(done)).await;
                        break;
                    }
                }
            }
        }
    });

    let stream = ReceiverStream::new(rx);
    Ok(Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
        .into_response())
}
