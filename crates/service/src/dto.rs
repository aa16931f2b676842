// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire DTOs produced for the HTTP surface.
//!
//! Artifact entries carry URLs only when ready. URLs are relative, rooted
//! at `/v2/jobs/<id>/artifacts/<name>` or
//! `/v2/batches/<id>/items/<idx>/artifacts/<name>`.

use indexmap::IndexMap;
use serde::Serialize;
use vox_core::{Artifact, Batch, BatchCounts, BatchItem, Job, JobError};
use vox_engine::QueueStats;

/// Error envelope: `{status:"error", error:{code, message, details?}}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub error: JobError,
}

impl ErrorBody {
    pub fn new(error: JobError) -> Self {
        Self { status: "error", error }
    }

    /// Standard HTTP status for the wrapped code.
    pub fn http_status(&self) -> u16 {
        self.error.code.http_status()
    }
}

/// `202 Accepted` body for job creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCreated {
    pub job_id: String,
    pub status_url: String,
}

/// `202 Accepted` body for batch creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreated {
    pub batch_id: String,
    pub status_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDto {
    pub name: String,
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ArtifactDto {
    fn from_artifact(artifact: &Artifact, url_base: &str) -> Self {
        Self {
            name: artifact.name.clone(),
            ready: artifact.ready,
            bytes: artifact.bytes.filter(|_| artifact.ready),
            url: artifact.ready.then(|| format!("{url_base}/{}", artifact.name)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDto {
    pub job_id: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub state: String,
    pub phase: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    pub source: String,
    pub queue: QueueStats,
    pub artifacts: IndexMap<String, ArtifactDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl JobDto {
    pub fn from_job(job: &Job, queue: QueueStats) -> Self {
        let url_base = format!("/v2/jobs/{}/artifacts", job.id);
        Self {
            job_id: job.id.to_string(),
            job_type: job.job_type.to_string(),
            state: job.state.to_string(),
            phase: job.phase.to_string(),
            created_at: rfc3339(job.created_at),
            started_at: job.started_at.map(rfc3339),
            finished_at: job.finished_at.map(rfc3339),
            expires_at: job.expires_at.map(rfc3339),
            source: job.source.to_string(),
            queue,
            artifacts: job
                .artifacts
                .iter()
                .map(|(key, a)| (key.to_string(), ArtifactDto::from_artifact(a, &url_base)))
                .collect(),
            error: job.error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemDto {
    pub idx: usize,
    pub source: String,
    pub state: String,
    pub phase: String,
    pub artifacts: IndexMap<String, ArtifactDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDto {
    pub batch_id: String,
    pub state: String,
    pub phase: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    pub cancel_requested: bool,
    pub counts: BatchCounts,
    pub items: Vec<BatchItemDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl BatchDto {
    pub fn from_batch(batch: &Batch) -> Self {
        Self {
            batch_id: batch.id.to_string(),
            state: batch.state.to_string(),
            phase: batch.phase.to_string(),
            created_at: rfc3339(batch.created_at),
            started_at: batch.started_at.map(rfc3339),
            finished_at: batch.finished_at.map(rfc3339),
            expires_at: batch.expires_at.map(rfc3339),
            cancel_requested: batch.cancel_requested,
            counts: batch.counts(),
            items: batch
                .items
                .iter()
                .map(|item| item_dto(batch.id.as_str(), item))
                .collect(),
            error: batch.error.clone(),
        }
    }
}

fn item_dto(batch_id: &str, item: &BatchItem) -> BatchItemDto {
    let url_base = format!("/v2/batches/{batch_id}/items/{}/artifacts", item.idx);
    BatchItemDto {
        idx: item.idx,
        source: item.source.to_string(),
        state: item.state.to_string(),
        phase: item.phase.to_string(),
        artifacts: item
            .artifacts
            .iter()
            .map(|(key, a)| (key.to_string(), ArtifactDto::from_artifact(a, &url_base)))
            .collect(),
        error: item.error.clone(),
    }
}

fn rfc3339(epoch_ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(epoch_ms as i64)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
#[path = "dto_tests.rs"]
mod tests;
