// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory job/batch tables.
//!
//! Each record is mutated only by the scheduler task that owns it; status
//! readers always get a value snapshot, never a reference, so a poll can
//! never tear a half-updated artifact map. The filesystem remains the
//! crash-consistent source of truth — this is a cache over it.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use vox_core::{Batch, BatchId, Job, JobId};

#[derive(Clone, Default)]
pub struct Registry {
    jobs: Arc<Mutex<HashMap<JobId, Job>>>,
    batches: Arc<Mutex<HashMap<BatchId, Batch>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the tables from a startup sweep.
    pub fn load(&self, jobs: Vec<Job>, batches: Vec<Batch>) {
        let mut job_table = self.jobs.lock();
        for job in jobs {
            job_table.insert(job.id.clone(), job);
        }
        let mut batch_table = self.batches.lock();
        for batch in batches {
            batch_table.insert(batch.id.clone(), batch);
        }
    }

    // --- jobs ---

    pub fn insert_job(&self, job: Job) {
        self.jobs.lock().insert(job.id.clone(), job);
    }

    /// Value snapshot of one job.
    pub fn job(&self, id: &str) -> Option<Job> {
        self.jobs.lock().get(id).cloned()
    }

    /// Write back a mutated record (owner task only).
    pub fn update_job(&self, job: &Job) {
        self.jobs.lock().insert(job.id.clone(), job.clone());
    }

    pub fn remove_job(&self, id: &str) {
        self.jobs.lock().remove(id);
    }

    pub fn jobs_snapshot(&self) -> Vec<Job> {
        self.jobs.lock().values().cloned().collect()
    }

    // --- batches ---

    pub fn insert_batch(&self, batch: Batch) {
        self.batches.lock().insert(batch.id.clone(), batch);
    }

    /// Value snapshot of one batch.
    pub fn batch(&self, id: &str) -> Option<Batch> {
        self.batches.lock().get(id).cloned()
    }

    /// Write back a mutated record (owner task only). The cancel flag is
    /// sticky: a concurrent cancel request is never clobbered by the
    /// runner's stale copy.
    pub fn update_batch(&self, batch: &Batch) {
        let mut table = self.batches.lock();
        let requested =
            table.get(batch.id.as_str()).map(|b| b.cancel_requested).unwrap_or(false);
        let mut copy = batch.clone();
        copy.cancel_requested |= requested;
        table.insert(copy.id.clone(), copy);
    }

    pub fn remove_batch(&self, id: &str) {
        self.batches.lock().remove(id);
    }

    pub fn batches_snapshot(&self) -> Vec<Batch> {
        self.batches.lock().values().cloned().collect()
    }

    /// Flag a batch for cooperative cancellation. Returns the updated
    /// snapshot, or `None` for an unknown id.
    pub fn request_batch_cancel(&self, id: &str) -> Option<Batch> {
        let mut table = self.batches.lock();
        let batch = table.get_mut(id)?;
        if !batch.is_terminal() {
            batch.cancel_requested = true;
        }
        Some(batch.clone())
    }

    pub fn batch_cancel_requested(&self, id: &str) -> bool {
        self.batches.lock().get(id).map(|b| b.cancel_requested).unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
