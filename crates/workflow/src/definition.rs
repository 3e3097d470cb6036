// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow definition types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parsed workflow: a named, ordered sequence of steps plus the tool
/// servers those steps may call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepDef>,
    /// Auxiliary subprocesses started before the first step that uses them
    #[serde(default, rename = "tool_servers")]
    pub tool_servers: Vec<ToolServerDef>,
    /// Declared input defaults, merged under submitted inputs
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub inputs: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen: Option<ListenDef>,
}

impl WorkflowDef {
    /// Look up a step by id.
    pub fn step(&self, id: &str) -> Option<&StepDef> {
        self.steps.iter().find(|s| s.id == id)
    }
}

/// Kind of work a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Shell command executed on the daemon host
    Command,
    /// Language-model prompt (requires a provider-backed executor)
    Prompt,
}

impl Default for StepKind {
    fn default() -> Self {
        StepKind::Prompt
    }
}

/// One unit of work within a workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepDef {
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: StepKind,
    /// Prompt template for `prompt` steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Shell command template for `command` steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Tools (as `server.tool` keys) this step is allowed to call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<OnErrorDef>,
}

impl StepDef {
    /// Check whether a step failure should be logged and skipped rather
    /// than terminating the run.
    pub fn ignores_errors(&self) -> bool {
        self.on_error
            .as_ref()
            .map(|e| e.strategy == ErrorStrategy::Ignore)
            .unwrap_or(false)
    }
}

/// Per-step error handling configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnErrorDef {
    #[serde(default)]
    pub strategy: ErrorStrategy,
}

/// What to do when a step's executor reports failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStrategy {
    /// Terminate the run with status failed
    #[default]
    Fail,
    /// Log the failure and continue with the next step
    Ignore,
}

/// An auxiliary subprocess that exposes callable tools to steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolServerDef {
    pub name: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

/// External trigger configuration for a workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListenDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiListenDef>,
}

/// Per-workflow public HTTP trigger.
///
/// `secret` may be written as `${ENV_NAME}` in the document; the parser
/// expands it from the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiListenDef {
    pub secret: String,
}

#[cfg(test)]
#[path = "definition_tests.rs"]
mod tests;
