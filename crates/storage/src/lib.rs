// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! skein-storage: durable backends and checkpointing for the daemon

mod backend;
mod checkpoint;
mod file;
mod memory;

pub use backend::{Backend, RunRecord, ScheduleState, StorageError};
pub use checkpoint::{
    CheckpointError, CheckpointStore, CheckpointWriter, FsCheckpointWriter, RunCheckpoint,
};
pub use file::FileBackend;
pub use memory::MemoryBackend;
