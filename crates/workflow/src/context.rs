// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template context threaded through a run's steps.

use serde_json::{json, Map, Value};

/// Values visible to step templates while a run executes.
///
/// Threaded as an explicit value from step to step, never global state.
/// Templates address it as `${inputs.<key>}` and `${steps.<id>.<key>}`.
#[derive(Debug, Clone, Default)]
pub struct WorkflowContext {
    inputs: Map<String, Value>,
    steps: Map<String, Value>,
}

impl WorkflowContext {
    /// Seed a context from run inputs with an empty `steps` sub-mapping.
    pub fn new(inputs: Map<String, Value>) -> Self {
        Self {
            inputs,
            steps: Map::new(),
        }
    }

    pub fn inputs(&self) -> &Map<String, Value> {
        &self.inputs
    }

    /// Output of an already-finished step, if any.
    pub fn step_output(&self, step_id: &str) -> Option<&Value> {
        self.steps.get(step_id)
    }

    /// Record a finished step's output so later steps can reference it.
    pub fn record_step_output(&mut self, step_id: &str, output: Map<String, Value>) {
        self.steps.insert(step_id.to_string(), Value::Object(output));
    }

    /// Project the context into the single JSON value templates resolve
    /// against.
    pub fn template_values(&self) -> Value {
        json!({
            "inputs": Value::Object(self.inputs.clone()),
            "steps": Value::Object(self.steps.clone()),
        })
    }

    /// Snapshot for checkpointing.
    pub fn to_value(&self) -> Value {
        self.template_values()
    }

    /// Rebuild a context from a checkpoint snapshot.
    pub fn from_value(value: &Value) -> Self {
        let get_map = |key: &str| -> Map<String, Value> {
            value
                .get(key)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default()
        };
        Self {
            inputs: get_map("inputs"),
            steps: get_map("steps"),
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
