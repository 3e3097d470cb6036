// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory backend for tests and stateless deployments.

use crate::backend::{record_matches, Backend, RunRecord, ScheduleState, StorageError};
use crate::checkpoint::RunCheckpoint;
use async_trait::async_trait;
use parking_lot::Mutex;
use skein_core::RunFilter;
use std::collections::HashMap;

/// Backend that keeps every record in process memory.
#[derive(Default)]
pub struct MemoryBackend {
    runs: Mutex<HashMap<String, RunRecord>>,
    checkpoints: Mutex<HashMap<String, RunCheckpoint>>,
    schedules: Mutex<HashMap<String, ScheduleState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn create_run(&self, record: &RunRecord) -> Result<(), StorageError> {
        self.runs.lock().insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn update_run(&self, record: &RunRecord) -> Result<(), StorageError> {
        self.runs.lock().insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_run(&self, id: &str) -> Result<RunRecord, StorageError> {
        self.runs
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn list_runs(&self, filter: &RunFilter) -> Result<Vec<RunRecord>, StorageError> {
        let runs = self.runs.lock();
        let mut matched: Vec<RunRecord> = runs
            .values()
            .filter(|r| record_matches(r, filter))
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn delete_run(&self, id: &str) -> Result<(), StorageError> {
        self.runs.lock().remove(id);
        Ok(())
    }

    async fn save_checkpoint(&self, checkpoint: &RunCheckpoint) -> Result<(), StorageError> {
        self.checkpoints
            .lock()
            .insert(checkpoint.run_id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn get_checkpoint(&self, run_id: &str) -> Result<Option<RunCheckpoint>, StorageError> {
        Ok(self.checkpoints.lock().get(run_id).cloned())
    }

    async fn save_schedule_state(
        &self,
        name: &str,
        state: &ScheduleState,
    ) -> Result<(), StorageError> {
        self.schedules
            .lock()
            .insert(name.to_string(), state.clone());
        Ok(())
    }

    async fn get_schedule_state(&self, name: &str) -> Result<Option<ScheduleState>, StorageError> {
        Ok(self.schedules.lock().get(name).cloned())
    }

    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
