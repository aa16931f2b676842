// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TTL enforcement for terminal records.
//!
//! Every minute, terminal jobs and batches past their `expiresAt` are
//! dropped from memory and their directories recursively deleted. The
//! companion startup sweep lives in vox-store.

use crate::registry::Registry;
use std::time::Duration;
use vox_core::Clock;
use vox_store::reap_dir;

pub const REAPER_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn the background sweep loop.
pub fn spawn_reaper<C: Clock>(registry: Registry, clock: C) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REAPER_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            sweep_expired(&registry, &clock).await;
        }
    })
}

/// One reaper pass. Idempotent: already-swept directories are gone from
/// the registry and deletion of a missing directory is a no-op.
pub async fn sweep_expired<C: Clock>(registry: &Registry, clock: &C) {
    let now = clock.epoch_ms();

    for job in registry.jobs_snapshot() {
        if job.is_terminal() && job.expires_at.is_some_and(|t| t <= now) {
            tracing::info!(job_id = %job.id, "reaping expired job");
            registry.remove_job(job.id.as_str());
            reap_dir(&job.out_dir).await;
        }
    }

    for batch in registry.batches_snapshot() {
        if batch.is_terminal() && batch.expires_at.is_some_and(|t| t <= now) {
            tracing::info!(batch_id = %batch.id, "reaping expired batch");
            registry.remove_batch(batch.id.as_str());
            reap_dir(&batch.out_dir).await;
        }
    }
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
