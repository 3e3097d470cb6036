// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run checkpointing with zstd compression and durable fsync.
//!
//! A checkpoint captures a run's progression just before a step executes,
//! so recovery after a crash resumes at the step that was about to run.
//! Replacement goes through three stages: the compressed bytes land in a
//! staging file and are flushed, the staging file is promoted onto the
//! live path by rename, and the containing directory is synced so the
//! rename itself survives a crash. A failure in any stage leaves the
//! previous checkpoint intact.
//!
//! The stages are split behind the [`CheckpointWriter`] trait so tests
//! can substitute a recording writer, assert the stage ordering, and
//! fail a chosen stage to exercise crash paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("compression error: {0}")]
    Compress(String),
}

/// Snapshot of a run's progression, saved before each step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCheckpoint {
    pub run_id: String,
    pub workflow_name: String,
    /// Content hash of the workflow document, for drift detection on resume
    pub workflow_hash: String,
    /// Step about to execute when the checkpoint was taken
    pub current_step_id: String,
    pub step_index: usize,
    /// Template context as of the checkpoint
    pub context: Value,
    /// Outputs of the steps finished so far, keyed by step id
    pub step_outputs: Map<String, Value>,
    pub saved_at: DateTime<Utc>,
}

/// Filesystem stages behind checkpoint persistence.
///
/// One call per durability stage, so a fake writer can record the order
/// and fail a specific stage.
pub trait CheckpointWriter: Send + Sync + 'static {
    /// Write compressed bytes to the staging path and flush them to disk.
    fn persist_staging(&self, staging: &Path, data: &[u8]) -> Result<(), CheckpointError>;

    /// Move the flushed staging file onto the live checkpoint path.
    fn promote(&self, staging: &Path, live: &Path) -> Result<(), CheckpointError>;

    /// Sync the containing directory so the promotion survives a crash.
    fn sync_dir(&self, dir: &Path) -> Result<(), CheckpointError>;
}

/// Writer backed by the real filesystem.
#[derive(Clone)]
pub struct FsCheckpointWriter;

impl CheckpointWriter for FsCheckpointWriter {
    fn persist_staging(&self, staging: &Path, data: &[u8]) -> Result<(), CheckpointError> {
        if let Some(parent) = staging.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(staging)?;
        file.write_all(data)?;
        file.sync_all()?;
        Ok(())
    }

    fn promote(&self, staging: &Path, live: &Path) -> Result<(), CheckpointError> {
        Ok(std::fs::rename(staging, live)?)
    }

    fn sync_dir(&self, dir: &Path) -> Result<(), CheckpointError> {
        Ok(File::open(dir)?.sync_all()?)
    }
}

/// Store of per-run checkpoint files.
///
/// One checkpoint per run id, replaced atomically on every save. A
/// disabled store turns every operation into a cheap no-op so callers
/// don't need their own conditionals.
pub struct CheckpointStore<W: CheckpointWriter = FsCheckpointWriter> {
    writer: W,
    dir: PathBuf,
    enabled: bool,
    compression_level: i32,
}

impl CheckpointStore<FsCheckpointWriter> {
    /// Create a store with the default filesystem writer.
    pub fn new(dir: PathBuf, enabled: bool) -> Self {
        Self::with_writer(FsCheckpointWriter, dir, enabled)
    }
}

impl<W: CheckpointWriter> CheckpointStore<W> {
    /// Create a store with a custom writer (for testing).
    pub fn with_writer(writer: W, dir: PathBuf, enabled: bool) -> Self {
        Self {
            writer,
            dir,
            enabled,
            // zstd level 3 is a good balance of speed and compression
            compression_level: 3,
        }
    }

    /// Whether checkpointing is active.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{run_id}.ckpt"))
    }

    /// Persist a checkpoint, replacing any previous one for the run.
    pub fn save(&self, checkpoint: &RunCheckpoint) -> Result<(), CheckpointError> {
        if !self.enabled {
            return Ok(());
        }

        let live = self.path_for(&checkpoint.run_id);
        let staging = live.with_extension("tmp");

        let json_bytes = serde_json::to_vec(checkpoint)?;
        let compressed = zstd::encode_all(json_bytes.as_slice(), self.compression_level)
            .map_err(|e| CheckpointError::Compress(e.to_string()))?;

        self.writer.persist_staging(&staging, &compressed)?;
        self.writer.promote(&staging, &live)?;
        // The rename is only durable once the directory is synced
        if let Some(parent) = live.parent() {
            self.writer.sync_dir(parent)?;
        }
        Ok(())
    }

    /// Load the checkpoint for a run, if one exists.
    pub fn load(&self, run_id: &str) -> Result<Option<RunCheckpoint>, CheckpointError> {
        if !self.enabled {
            return Ok(None);
        }
        let path = self.path_for(run_id);
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(path)?;
        let decoder = zstd::stream::read::Decoder::new(file)
            .map_err(|e| CheckpointError::Compress(e.to_string()))?;
        let checkpoint: RunCheckpoint = serde_json::from_reader(decoder)?;
        Ok(Some(checkpoint))
    }

    /// Remove a run's checkpoint. Missing files are fine.
    pub fn delete(&self, run_id: &str) -> Result<(), CheckpointError> {
        if !self.enabled {
            return Ok(());
        }
        let path = self.path_for(run_id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// List checkpoints left behind by runs that never completed.
    ///
    /// Unreadable files are skipped with a warning so one corrupt
    /// checkpoint cannot block startup.
    pub fn list_interrupted(&self) -> Result<Vec<RunCheckpoint>, CheckpointError> {
        if !self.enabled || !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("ckpt") {
                continue;
            }
            let run_id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            match self.load(&run_id) {
                Ok(Some(checkpoint)) => found.push(checkpoint),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable checkpoint");
                }
            }
        }
        found.sort_by(|a, b| a.saved_at.cmp(&b.saved_at));
        Ok(found)
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
