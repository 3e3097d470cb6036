// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed backend: one JSON document per run.

use crate::backend::{record_matches, Backend, RunRecord, ScheduleState, StorageError};
use crate::checkpoint::RunCheckpoint;
use async_trait::async_trait;
use skein_core::RunFilter;
use std::path::{Path, PathBuf};

/// Backend persisting each record as a JSON file under a state directory.
///
/// Writes go through a `.tmp` sibling and an atomic rename so a crash can
/// leave a stale record but never a torn one.
pub struct FileBackend {
    runs_dir: PathBuf,
    checkpoints_dir: PathBuf,
    schedules_dir: PathBuf,
}

impl FileBackend {
    /// Create the backend, ensuring its subdirectories exist.
    pub fn open(root: &Path) -> Result<Self, StorageError> {
        let runs_dir = root.join("runs");
        let checkpoints_dir = root.join("checkpoint-records");
        let schedules_dir = root.join("schedules");
        std::fs::create_dir_all(&runs_dir)?;
        std::fs::create_dir_all(&checkpoints_dir)?;
        std::fs::create_dir_all(&schedules_dir)?;
        Ok(Self {
            runs_dir,
            checkpoints_dir,
            schedules_dir,
        })
    }

    fn run_path(&self, id: &str) -> PathBuf {
        self.runs_dir.join(format!("{id}.json"))
    }

    fn checkpoint_path(&self, run_id: &str) -> PathBuf {
        self.checkpoints_dir.join(format!("{run_id}.json"))
    }

    fn schedule_path(&self, name: &str) -> PathBuf {
        self.schedules_dir.join(format!("{name}.json"))
    }

    fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[async_trait]
impl Backend for FileBackend {
    async fn create_run(&self, record: &RunRecord) -> Result<(), StorageError> {
        let data = serde_json::to_vec_pretty(record)?;
        Self::write_atomic(&self.run_path(&record.id), &data)
    }

    async fn update_run(&self, record: &RunRecord) -> Result<(), StorageError> {
        self.create_run(record).await
    }

    async fn get_run(&self, id: &str) -> Result<RunRecord, StorageError> {
        let path = self.run_path(id);
        if !path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        let data = std::fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    async fn list_runs(&self, filter: &RunFilter) -> Result<Vec<RunRecord>, StorageError> {
        let mut matched = Vec::new();
        for entry in std::fs::read_dir(&self.runs_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let data = std::fs::read(&path)?;
            match serde_json::from_slice::<RunRecord>(&data) {
                Ok(record) if record_matches(&record, filter) => matched.push(record),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable run record");
                }
            }
            if let Some(limit) = filter.limit {
                if matched.len() >= limit {
                    break;
                }
            }
        }
        Ok(matched)
    }

    async fn delete_run(&self, id: &str) -> Result<(), StorageError> {
        let path = self.run_path(id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    async fn save_checkpoint(&self, checkpoint: &RunCheckpoint) -> Result<(), StorageError> {
        let data = serde_json::to_vec_pretty(checkpoint)?;
        Self::write_atomic(&self.checkpoint_path(&checkpoint.run_id), &data)
    }

    async fn get_checkpoint(&self, run_id: &str) -> Result<Option<RunCheckpoint>, StorageError> {
        let path = self.checkpoint_path(run_id);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read(path)?;
        Ok(Some(serde_json::from_slice(&data)?))
    }

    async fn save_schedule_state(
        &self,
        name: &str,
        state: &ScheduleState,
    ) -> Result<(), StorageError> {
        let data = serde_json::to_vec_pretty(state)?;
        Self::write_atomic(&self.schedule_path(name), &data)
    }

    async fn get_schedule_state(&self, name: &str) -> Result<Option<ScheduleState>, StorageError> {
        let path = self.schedule_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read(path)?;
        Ok(Some(serde_json::from_slice(&data)?))
    }

    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
