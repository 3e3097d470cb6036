// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed step output and its projections.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use skein_adapters::StepResult;
use std::time::Duration;

/// Typed form of a step's output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepOutput {
    /// Primary text: the `text` key, else `response`, else empty
    pub text: String,
    /// The step's entire raw output mapping
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: OutputMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputMetadata {
    pub duration: Duration,
}

impl StepOutput {
    /// Collapse an executor result into the typed form.
    pub fn from_result(result: &StepResult) -> Self {
        let text = result
            .output
            .get("text")
            .and_then(Value::as_str)
            .or_else(|| result.output.get("response").and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();
        Self {
            text,
            data: Value::Object(result.output.clone()),
            error: result.error.clone(),
            metadata: OutputMetadata {
                duration: result.duration,
            },
        }
    }
}

/// Project a typed output into the mapping shown as a run's `output`.
///
/// A non-empty `text` becomes `response`; object data merges into the
/// result while anything else lands under a `data` key; a non-empty
/// `error` is carried through.
pub fn project_output(output: &StepOutput) -> Map<String, Value> {
    let mut result = Map::new();
    if !output.text.is_empty() {
        result.insert("response".to_string(), Value::String(output.text.clone()));
    }
    match &output.data {
        Value::Object(map) => {
            for (key, value) in map {
                result.insert(key.clone(), value.clone());
            }
        }
        Value::Null => {}
        other => {
            result.insert("data".to_string(), other.clone());
        }
    }
    if let Some(error) = &output.error {
        if !error.is_empty() {
            result.insert("error".to_string(), Value::String(error.clone()));
        }
    }
    result
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
