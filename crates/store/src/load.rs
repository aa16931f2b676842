// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Load persisted records and reconcile them with the filesystem.
//!
//! A record's `outDir` and artifact paths are rewritten to the directory it
//! was actually loaded from (directories move between hosts and across
//! restarts). Each artifact is then stat'ed: `ready ⇔ regular file at
//! path`, with `bytes` tracking the on-disk size. Reconciliation is
//! idempotent and never deletes files.

use crate::{BATCH_META, JOB_META};
use std::path::{Path, PathBuf};
use vox_core::{ArtifactMap, Batch, Job};

/// Read job metadata from `dir`. Missing or malformed metadata yields
/// `None` (the directory is then a candidate for the mtime TTL sweep).
pub async fn load_job(dir: &Path) -> Option<Job> {
    let raw = tokio::fs::read(dir.join(JOB_META)).await.ok()?;
    let mut job: Job = match serde_json::from_slice(&raw) {
        Ok(job) => job,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "malformed job metadata");
            return None;
        }
    };
    let old_out_dir = std::mem::replace(&mut job.out_dir, dir.to_path_buf());
    if let Some(audio) = job.audio_path.take() {
        job.audio_path = Some(rebase(&audio, &old_out_dir, dir));
    }
    reconcile_artifacts(&mut job.artifacts, &old_out_dir, dir, dir).await;
    Some(job)
}

/// Read batch metadata from `dir`; same contract as [`load_job`]. Item
/// artifact paths resolve against the batch directory.
pub async fn load_batch(dir: &Path) -> Option<Batch> {
    let raw = tokio::fs::read(dir.join(BATCH_META)).await.ok()?;
    let mut batch: Batch = match serde_json::from_slice(&raw) {
        Ok(batch) => batch,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "malformed batch metadata");
            return None;
        }
    };
    let old_out_dir = std::mem::replace(&mut batch.out_dir, dir.to_path_buf());
    for item in &mut batch.items {
        if let Some(audio) = item.audio_path.take() {
            item.audio_path = Some(rebase(&audio, &old_out_dir, dir));
        }
        let item_dir = crate::Layout::batch_item_dir(dir, item.idx);
        reconcile_artifacts(&mut item.artifacts, &old_out_dir, dir, &item_dir).await;
    }
    Some(batch)
}

/// Rewrite a path recorded under a (possibly stale) `outDir` so it points
/// inside `new_dir`. Relative paths resolve against `new_dir`; absolute
/// paths under the old directory keep their suffix; anything else (an
/// unowned input outside the store) is left alone.
fn rebase(path: &Path, old_dir: &Path, new_dir: &Path) -> PathBuf {
    if path.is_relative() {
        return new_dir.join(path);
    }
    match path.strip_prefix(old_dir) {
        Ok(rel) => new_dir.join(rel),
        Err(_) => path.to_path_buf(),
    }
}

async fn reconcile_artifacts(
    artifacts: &mut ArtifactMap,
    old_dir: &Path,
    new_dir: &Path,
    fallback_dir: &Path,
) {
    for artifact in artifacts.values_mut() {
        let resolved = if artifact.path.is_relative() {
            new_dir.join(&artifact.path)
        } else {
            match artifact.path.strip_prefix(old_dir) {
                Ok(rel) => new_dir.join(rel),
                // Absolute path from another layout root: fall back to the
                // stable name inside the artifact's home directory.
                Err(_) => fallback_dir.join(&artifact.name),
            }
        };
        match tokio::fs::metadata(&resolved).await {
            Ok(meta) if meta.is_file() => {
                artifact.ready = true;
                artifact.bytes = Some(meta.len());
            }
            _ => {
                artifact.ready = false;
                artifact.bytes = None;
            }
        }
        artifact.path = resolved;
    }
}

#[cfg(test)]
#[path = "load_tests.rs"]
mod tests;
