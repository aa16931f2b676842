// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup sweep over the persistence directories.
//!
//! Three classes of entry:
//! - parseable and expired: deleted;
//! - parseable but still `queued`/`running`: failed with `internal_error`
//!   ("interrupted by server restart") — interrupted work is never resumed;
//! - unparseable: deleted once the directory mtime is older than the TTL.
//!
//! Survivors are returned so the caller can repopulate its in-memory
//! tables. The upload spool is cleared of entries older than the TTL.

use crate::{load_batch, load_job, persist_batch, persist_job, Layout};
use std::path::Path;
use std::time::UNIX_EPOCH;
use vox_core::{Batch, Clock, Job, JobError};

/// Outcome of [`sweep_on_startup`].
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Records that remain live (including freshly interrupted ones).
    pub jobs: Vec<Job>,
    pub batches: Vec<Batch>,
    /// Directories deleted (expired or unparseable past TTL).
    pub reaped: usize,
    /// Records failed with "interrupted by server restart".
    pub interrupted: usize,
}

/// Best-effort recursive delete. Failures are logged, never surfaced.
pub async fn reap_dir(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to remove directory");
        }
    }
}

/// Sweep `jobs-v2/`, `batches/`, and the upload spool at process start.
pub async fn sweep_on_startup<C: Clock>(layout: &Layout, clock: &C, ttl_ms: u64) -> SweepReport {
    let now = clock.epoch_ms();
    let mut report = SweepReport::default();

    for entry in read_dirs(&layout.jobs_dir()).await {
        match load_job(&entry).await {
            Some(mut job) => {
                if job.is_terminal() {
                    if job.expires_at.is_some_and(|t| t <= now) {
                        reap_dir(&entry).await;
                        report.reaped += 1;
                    } else {
                        report.jobs.push(job);
                    }
                } else {
                    job.finalize_failure(interrupted_error(), clock, ttl_ms);
                    if let Err(e) = persist_job(&job).await {
                        tracing::warn!(job_id = %job.id, error = %e, "failed to persist interrupted job");
                    }
                    tracing::info!(job_id = %job.id, "failed job interrupted by server restart");
                    report.interrupted += 1;
                    report.jobs.push(job);
                }
            }
            None => {
                if older_than(&entry, now, ttl_ms).await {
                    reap_dir(&entry).await;
                    report.reaped += 1;
                }
            }
        }
    }

    for entry in read_dirs(&layout.batches_dir()).await {
        match load_batch(&entry).await {
            Some(mut batch) => {
                if batch.is_terminal() {
                    if batch.expires_at.is_some_and(|t| t <= now) {
                        reap_dir(&entry).await;
                        report.reaped += 1;
                    } else {
                        report.batches.push(batch);
                    }
                } else {
                    for item in &mut batch.items {
                        if !item.is_terminal() {
                            item.fail(interrupted_error(), clock);
                        }
                    }
                    batch.finalize_failure(interrupted_error(), clock, ttl_ms);
                    if let Err(e) = persist_batch(&batch).await {
                        tracing::warn!(batch_id = %batch.id, error = %e, "failed to persist interrupted batch");
                    }
                    tracing::info!(batch_id = %batch.id, "failed batch interrupted by server restart");
                    report.interrupted += 1;
                    report.batches.push(batch);
                }
            }
            None => {
                if older_than(&entry, now, ttl_ms).await {
                    reap_dir(&entry).await;
                    report.reaped += 1;
                }
            }
        }
    }

    // Transient spool: anything that outlived the TTL was abandoned by its
    // request.
    for entry in read_all(&layout.uploads_dir()).await {
        if older_than(&entry, now, ttl_ms).await {
            if let Err(e) = tokio::fs::remove_file(&entry).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %entry.display(), error = %e, "failed to remove stale upload");
                }
            }
        }
    }

    tracing::info!(
        jobs = report.jobs.len(),
        batches = report.batches.len(),
        reaped = report.reaped,
        interrupted = report.interrupted,
        "startup sweep complete"
    );
    report
}

fn interrupted_error() -> JobError {
    JobError::internal("interrupted by server restart")
}

/// Directory mtime is older than the TTL. Unreadable metadata counts as
/// old — a directory we cannot stat cannot be kept alive forever.
async fn older_than(path: &Path, now_ms: u64, ttl_ms: u64) -> bool {
    let mtime_ms = match tokio::fs::metadata(path).await {
        Ok(meta) => meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64),
        Err(_) => None,
    };
    match mtime_ms {
        Some(mtime) => now_ms.saturating_sub(mtime) > ttl_ms,
        None => true,
    }
}

async fn read_dirs(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    let Ok(mut rd) = tokio::fs::read_dir(dir).await else {
        return out;
    };
    while let Ok(Some(entry)) = rd.next_entry().await {
        if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            out.push(entry.path());
        }
    }
    out.sort();
    out
}

async fn read_all(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    let Ok(mut rd) = tokio::fs::read_dir(dir).await else {
        return out;
    };
    while let Ok(Some(entry)) = rd.next_entry().await {
        out.push(entry.path());
    }
    out
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
