// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run submission and inspection handlers.

use super::error::{bad_request, ApiError};
use super::AppState;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};
use skein_core::{RunFilter, RunStatus};
use skein_engine::{CancelOutcome, EngineError, SubmitRequest, WorkflowSource};
use std::collections::HashMap;

/// Query keys with meaning to the daemon; everything else becomes a run
/// input.
const RESERVED_QUERY_KEYS: &[&str] = &["remote_ref", "dry_run", "no_cache", "correlation_id"];

/// Maximum inline workflow document size (4 MiB).
const MAX_WORKFLOW_BODY: usize = 4 * 1024 * 1024;

fn query_inputs(params: &HashMap<String, String>) -> Map<String, Value> {
    params
        .iter()
        .filter(|(key, _)| !RESERVED_QUERY_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect()
}

fn flag(params: &HashMap<String, String>, key: &str) -> bool {
    params
        .get(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

/// POST /v1/runs: content-negotiated submission.
pub async fn submit(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    request: Request,
) -> Result<Response, ApiError> {
    let mut inputs = query_inputs(&params);

    let source = if let Some(reference) = params.get("remote_ref") {
        WorkflowSource::Remote(reference.clone())
    } else {
        let content_type = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(request, &())
                .await
                .map_err(|e| bad_request(format!("invalid multipart body: {e}")))?;
            let (bytes, form_inputs) = read_multipart(multipart).await?;
            for (key, value) in form_inputs {
                inputs.insert(key, value);
            }
            WorkflowSource::Inline(bytes)
        } else if content_type.starts_with("application/x-yaml")
            || content_type.starts_with("text/yaml")
        {
            let bytes = read_body(request).await?;
            if bytes.is_empty() {
                return Err(bad_request("empty workflow body"));
            }
            WorkflowSource::Inline(bytes.to_vec())
        } else if content_type.starts_with("application/json") {
            return Err(bad_request(
                "workflow references in JSON bodies are not supported yet; \
                 submit YAML or use the remote_ref query parameter",
            ));
        } else {
            return Err(bad_request(format!(
                "unsupported content type '{content_type}'"
            )));
        }
    };

    let snapshot = state
        .runner
        .submit(SubmitRequest {
            source,
            inputs,
            correlation_id: params.get("correlation_id").cloned(),
            dry_run: flag(&params, "dry_run"),
            no_cache: flag(&params, "no_cache"),
        })
        .await?;

    Ok((StatusCode::ACCEPTED, Json(snapshot)).into_response())
}

async fn read_body(request: Request) -> Result<Bytes, ApiError> {
    axum::body::to_bytes(request.into_body(), MAX_WORKFLOW_BODY)
        .await
        .map_err(|e| bad_request(format!("failed to read body: {e}")))
}

async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(Vec<u8>, Map<String, Value>), ApiError> {
    let mut workflow = None;
    let mut inputs = Map::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("invalid multipart field '{name}': {e}")))?;
        if name == "workflow" {
            workflow = Some(data.to_vec());
        } else if !name.is_empty() {
            inputs.insert(
                name,
                Value::String(String::from_utf8_lossy(&data).to_string()),
            );
        }
    }

    match workflow {
        Some(bytes) => Ok((bytes, inputs)),
        None => Err(bad_request("multipart body is missing a 'workflow' part")),
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct ListParams {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    workflow: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

/// GET /v1/runs
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let status = params
        .status
        .map(|s| {
            s.parse::<RunStatus>()
                .map_err(|e| bad_request(format!("invalid status filter: {e}")))
        })
        .transpose()?;

    let runs = state.runner.list(&RunFilter {
        status,
        workflow_name: params.workflow,
        limit: params.limit,
    });
    Ok(Json(json!({ "runs": runs })))
}

/// GET /v1/runs/{id}
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<skein_core::RunSnapshot>, ApiError> {
    Ok(Json(state.runner.get(&id)?))
}

/// GET /v1/runs/{id}/output, only once the run has completed.
pub async fn output(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let snapshot = state.runner.get(&id)?;
    if snapshot.status != RunStatus::Completed {
        return Err(ApiError::Engine(EngineError::Conflict(format!(
            "run '{id}' is {}, not completed",
            snapshot.status
        ))));
    }
    Ok(Json(Value::Object(snapshot.output)))
}

/// DELETE /v1/runs/{id}
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    match state.runner.cancel(&id)? {
        CancelOutcome::Delivered => Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "status": "cancelling" })),
        )
            .into_response()),
        // Cancelling a cancelled run stays idempotent success
        CancelOutcome::AlreadyTerminal(RunStatus::Cancelled) => Ok((
            StatusCode::OK,
            Json(json!({ "status": "cancelled" })),
        )
            .into_response()),
        CancelOutcome::AlreadyTerminal(status) => Err(ApiError::Engine(EngineError::Conflict(format!(
            "run '{id}' already {status}"
        )))),
    }
}
