// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mapping engine errors onto HTTP responses.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use skein_engine::EngineError;

/// Error carried through an axum handler.
#[derive(Debug)]
pub enum ApiError {
    Engine(EngineError),
    /// Auth failure on the public trigger route
    Unauthorized(String),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, retry_after) = match self {
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message, None),
            ApiError::Engine(e) => {
                let status = match &e {
                    EngineError::Validation(_) => StatusCode::BAD_REQUEST,
                    EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                    EngineError::Conflict(_) => StatusCode::CONFLICT,
                    EngineError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    EngineError::Upstream(_) => StatusCode::BAD_GATEWAY,
                    EngineError::Cancelled
                    | EngineError::StepFailure(_)
                    | EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let retry_after = match &e {
                    EngineError::Unavailable { retry_after, .. } => Some(retry_after.as_secs()),
                    _ => None,
                };
                (status, e.to_string(), retry_after)
            }
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();
        if let Some(seconds) = retry_after {
            if let Ok(value) = seconds.to_string().parse() {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Shorthand for a 400 with a message.
pub fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError::Engine(EngineError::Validation(message.into()))
}
