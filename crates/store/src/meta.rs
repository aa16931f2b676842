// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-atomic metadata writes.
//!
//! Serialize to `<dir>/<name>.tmp.<uniq>`, then rename into place. After a
//! crash between writes, a load either sees the last committed file or
//! nothing; stray `.tmp.` files are ignored by loads and removed by the
//! TTL sweep with the rest of the directory.

use crate::{StoreError, BATCH_META, JOB_META};
use serde::Serialize;
use std::path::Path;
use vox_core::{Batch, Job};

/// Atomically (re)write `<dir>/<name>`.
///
/// On a rename failure indicating the destination exists (non-POSIX rename
/// semantics), the target is removed and the rename retried once.
pub async fn write_meta_atomic<T: Serialize>(
    dir: &Path,
    name: &str,
    value: &T,
) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = dir.join(format!("{name}.tmp.{}", nanoid::nanoid!(8)));
    tokio::fs::write(&tmp, &bytes).await?;

    let dest = dir.join(name);
    match tokio::fs::rename(&tmp, &dest).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            tokio::fs::remove_file(&dest).await?;
            tokio::fs::rename(&tmp, &dest).await?;
            Ok(())
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&tmp).await;
            Err(e.into())
        }
    }
}

/// Persist a job record into its `outDir`.
pub async fn persist_job(job: &Job) -> Result<(), StoreError> {
    write_meta_atomic(&job.out_dir, JOB_META, job).await
}

/// Persist a batch record into its `outDir`.
pub async fn persist_batch(batch: &Batch) -> Result<(), StoreError> {
    write_meta_atomic(&batch.out_dir, BATCH_META, batch).await
}

#[cfg(test)]
#[path = "meta_tests.rs"]
mod tests;
