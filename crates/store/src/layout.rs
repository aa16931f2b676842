// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout under the configured tmp root.
//!
//! ```text
//! <root>/uploads/              transient upload spool
//! <root>/out/<request-id>/     per-request scratch for synchronous endpoints
//! <root>/jobs-v2/<jobId>/      job.json + input + artifacts at stable names
//! <root>/batches/<batchId>/    batch.json, inputs/<idx>.<ext>, items/<idx>/...
//! ```

use crate::StoreError;
use std::path::{Path, PathBuf};
use vox_core::{BatchId, JobId};

/// Metadata file name inside a job directory.
pub const JOB_META: &str = "job.json";
/// Metadata file name inside a batch directory.
pub const BATCH_META: &str = "batch.json";

/// Resolver for every path the store owns.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join("out")
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.root.join("jobs-v2")
    }

    pub fn batches_dir(&self) -> PathBuf {
        self.root.join("batches")
    }

    pub fn job_dir(&self, id: &JobId) -> PathBuf {
        self.jobs_dir().join(id.as_str())
    }

    pub fn batch_dir(&self, id: &BatchId) -> PathBuf {
        self.batches_dir().join(id.as_str())
    }

    /// `inputs/<idx>.<ext>` inside a batch directory.
    pub fn batch_input_path(batch_dir: &Path, idx: usize, ext: &str) -> PathBuf {
        batch_dir.join("inputs").join(format!("{idx}.{ext}"))
    }

    /// `items/<idx>/` inside a batch directory.
    pub fn batch_item_dir(batch_dir: &Path, idx: usize) -> PathBuf {
        batch_dir.join("items").join(idx.to_string())
    }

    /// Create the fixed directories. Job/batch directories are created per
    /// record at submission time.
    pub async fn ensure(&self) -> Result<(), StoreError> {
        for dir in
            [self.uploads_dir(), self.scratch_dir(), self.jobs_dir(), self.batches_dir()]
        {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
