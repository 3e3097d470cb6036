// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide registry of callable tools.

use parking_lot::Mutex;
use skein_adapters::ToolDefinition;
use std::collections::HashMap;

/// Registry of tools discovered from running tool servers.
///
/// Keys are `serverName.toolName`. Registration is additive and
/// idempotent per key: concurrent runs of one workflow register the same
/// tools without conflict.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Mutex<HashMap<String, ToolDefinition>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under `server.tool`. Returns false if the key was
    /// already present (the existing definition is kept).
    pub fn register(&self, server: &str, tool: ToolDefinition) -> bool {
        let key = format!("{}.{}", server, tool.name);
        let mut tools = self.tools.lock();
        if tools.contains_key(&key) {
            return false;
        }
        tools.insert(key, tool);
        true
    }

    /// Look up a tool by its `server.tool` key.
    pub fn get(&self, key: &str) -> Option<ToolDefinition> {
        self.tools.lock().get(key).cloned()
    }

    /// All registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.tools.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.tools.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
