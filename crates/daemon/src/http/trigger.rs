// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token-authenticated public workflow trigger.

use super::error::{bad_request, ApiError};
use super::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{Map, Value};
use skein_engine::{EngineError, SubmitRequest};
use skein_workflow::{find_workflow_file, parse_workflow};

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// POST /v1/start/{workflow}
///
/// Only workflows declaring `listen.api` are reachable here; the caller
/// must present the workflow's secret as a bearer token. The request body
/// (if any) is a JSON object of inputs.
pub async fn start(
    State(state): State<AppState>,
    Path(workflow): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let not_found = || EngineError::NotFound(format!("workflow '{workflow}'"));

    // A workflow that doesn't listen is indistinguishable from a missing
    // one, so probing can't enumerate trigger-less workflows
    let dir = state.workflows_dir.as_ref().ok_or_else(not_found)?;
    let path = find_workflow_file(dir, &workflow).map_err(|_| not_found())?;
    let bytes = std::fs::read(&path)
        .map_err(|e| EngineError::Upstream(format!("failed to read workflow file: {e}")))?;
    let def = parse_workflow(&bytes)
        .map_err(|e| EngineError::Validation(format!("failed to parse workflow: {e}")))?;

    let secret = def
        .listen
        .as_ref()
        .and_then(|l| l.api.as_ref())
        .map(|api| api.secret.as_str())
        .filter(|secret| !secret.is_empty())
        .ok_or_else(not_found)?;

    match bearer_token(&headers) {
        Some(token) if token == secret => {}
        _ => {
            return Err(ApiError::Unauthorized(
                "invalid or missing bearer token".to_string(),
            ));
        }
    }

    let inputs: Map<String, Value> = if body.is_empty() {
        Map::new()
    } else {
        serde_json::from_slice::<Value>(&body)
            .ok()
            .and_then(|v| v.as_object().cloned())
            .ok_or_else(|| bad_request("request body must be a JSON object"))?
    };

    let snapshot = state
        .runner
        .submit(SubmitRequest::named(&workflow).with_inputs(inputs))
        .await?;
    Ok((StatusCode::ACCEPTED, Json(snapshot)).into_response())
}
