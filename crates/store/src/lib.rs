// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vox-store: filesystem-backed artifact store.
//!
//! Owns the on-disk layout of jobs and batches, atomic metadata writes,
//! load-time reconciliation of declared artifacts against the filesystem,
//! and the startup sweep that fails interrupted records and deletes
//! expired ones. The filesystem is the crash-consistent source of truth;
//! in-memory state is a cache over it.

mod layout;
mod load;
mod meta;
mod sweep;

pub use layout::{Layout, BATCH_META, JOB_META};
pub use load::{load_batch, load_job};
pub use meta::{persist_batch, persist_job, write_meta_atomic};
pub use sweep::{reap_dir, sweep_on_startup, SweepReport};

use vox_core::JobError;

/// Errors from metadata I/O.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<StoreError> for JobError {
    fn from(e: StoreError) -> Self {
        JobError::internal(e.to_string())
    }
}
