// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow document parsing (YAML)

use crate::definition::WorkflowDef;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;

/// Regex pattern for ${ENV_NAME} secret references
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static ENV_REF_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$\{([A-Za-z_][A-Za-z0-9_]*)\}$").expect("constant regex pattern is valid"));

/// Errors that can occur during workflow parsing
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("workflow document is not valid UTF-8")]
    Encoding,

    #[error("invalid workflow: {0}")]
    Invalid(String),
}

/// Parse and validate a workflow document.
///
/// Validation covers the structural rules the engine depends on: a
/// non-empty name, at least one step, unique step ids, each step carrying
/// the body its kind requires, and unique tool-server names. The
/// `listen.api.secret` field is expanded from the environment when written
/// as `${ENV_NAME}`.
pub fn parse_workflow(bytes: &[u8]) -> Result<WorkflowDef, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::Encoding)?;
    let mut def: WorkflowDef = serde_yaml::from_str(text)?;
    validate(&def)?;
    expand_listen_secret(&mut def);
    Ok(def)
}

fn validate(def: &WorkflowDef) -> Result<(), ParseError> {
    if def.name.trim().is_empty() {
        return Err(ParseError::Invalid("workflow name is required".into()));
    }
    if def.steps.is_empty() {
        return Err(ParseError::Invalid(format!(
            "workflow '{}' has no steps",
            def.name
        )));
    }

    let mut seen = HashSet::new();
    for step in &def.steps {
        if step.id.trim().is_empty() {
            return Err(ParseError::Invalid(format!(
                "workflow '{}' has a step without an id",
                def.name
            )));
        }
        if !seen.insert(step.id.as_str()) {
            return Err(ParseError::Invalid(format!(
                "duplicate step id '{}'",
                step.id
            )));
        }
        match step.kind {
            crate::definition::StepKind::Command if step.command.is_none() => {
                return Err(ParseError::Invalid(format!(
                    "command step '{}' has no command",
                    step.id
                )));
            }
            crate::definition::StepKind::Prompt if step.prompt.is_none() => {
                return Err(ParseError::Invalid(format!(
                    "prompt step '{}' has no prompt",
                    step.id
                )));
            }
            _ => {}
        }
    }

    let mut servers = HashSet::new();
    for server in &def.tool_servers {
        if server.name.trim().is_empty() {
            return Err(ParseError::Invalid("tool server without a name".into()));
        }
        if !servers.insert(server.name.as_str()) {
            return Err(ParseError::Invalid(format!(
                "duplicate tool server '{}'",
                server.name
            )));
        }
        if server.command.trim().is_empty() {
            return Err(ParseError::Invalid(format!(
                "tool server '{}' has no command",
                server.name
            )));
        }
    }

    Ok(())
}

/// Expand `${ENV}` in `listen.api.secret`. An unset variable leaves an
/// empty secret, which disables the trigger rather than exposing the
/// literal placeholder as a password.
fn expand_listen_secret(def: &mut WorkflowDef) {
    let Some(listen) = def.listen.as_mut() else {
        return;
    };
    let Some(api) = listen.api.as_mut() else {
        return;
    };
    if let Some(caps) = ENV_REF_PATTERN.captures(&api.secret) {
        api.secret = std::env::var(&caps[1]).unwrap_or_default();
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
