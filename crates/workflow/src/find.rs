// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow file discovery

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from workflow file lookup
#[derive(Debug, Error)]
pub enum FindError {
    #[error("workflow '{0}' not found")]
    NotFound(String),
    #[error("invalid workflow name '{0}'")]
    InvalidName(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Locate a named workflow in a workflows directory.
///
/// Names map to `<name>.yaml` (preferred) or `<name>.yml`. Path separators
/// and parent references are rejected so a name can never escape the
/// directory.
pub fn find_workflow_file(dir: &Path, name: &str) -> Result<PathBuf, FindError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(FindError::InvalidName(name.to_string()));
    }

    for ext in ["yaml", "yml"] {
        let candidate = dir.join(format!("{name}.{ext}"));
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(FindError::NotFound(name.to_string()))
}

/// List the workflow files in a directory (non-recursive), sorted by name.
pub fn list_workflow_files(dir: &Path) -> Result<Vec<PathBuf>, FindError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yaml" || e == "yml");
        if path.is_file() && is_yaml {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
#[path = "find_tests.rs"]
mod tests;
