// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use vox_core::{ArtifactKey, BatchState, ErrorCode, FakeClock, ItemState, JobPhase, JobState};

fn stats() -> QueueStats {
    QueueStats { pending: 2, running: 1 }
}

#[test]
fn error_body_has_the_documented_envelope() {
    let body = ErrorBody::new(JobError::bad_audio("decoder refused").with_details("tail"));
    assert_eq!(body.http_status(), 422);
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["code"], "bad_audio");
    assert_eq!(json["error"]["message"], "decoder refused");
    assert_eq!(json["error"]["details"], "tail");
}

#[test]
fn ready_artifacts_carry_relative_urls() {
    let mut job = Job::builder().id("job-42").build();
    job.publish(ArtifactKey::Srt, "/out/job-42/output.srt".into(), 99);
    let dto = JobDto::from_job(&job, stats());

    let srt = &dto.artifacts["srt"];
    assert!(srt.ready);
    assert_eq!(srt.bytes, Some(99));
    assert_eq!(srt.url.as_deref(), Some("/v2/jobs/job-42/artifacts/output.srt"));
}

#[test]
fn unready_artifacts_carry_no_url() {
    let mut job = Job::builder().id("job-42").build();
    job.publish(ArtifactKey::Srt, "/out/job-42/output.srt".into(), 99);
    if let Some(artifact) = job.artifacts.get_mut(&ArtifactKey::Srt) {
        artifact.ready = false;
    }
    let dto = JobDto::from_job(&job, stats());
    let srt = &dto.artifacts["srt"];
    assert!(!srt.ready);
    assert_eq!(srt.url, None);
    assert_eq!(srt.bytes, None);
}

#[test]
fn job_dto_carries_queue_counters_and_names() {
    let clock = FakeClock::new();
    let mut job = Job::builder().id("job-42").job_type(vox_core::JobType::AsrDemucs).build();
    job.begin(&clock);
    job.phase = JobPhase::Asr;
    let dto = JobDto::from_job(&job, stats());

    assert_eq!(dto.job_id, "job-42");
    assert_eq!(dto.job_type, "asr-demucs");
    assert_eq!(dto.state, "running");
    assert_eq!(dto.phase, "asr");
    assert_eq!(dto.queue, QueueStats { pending: 2, running: 1 });

    let json = serde_json::to_value(&dto).unwrap();
    assert_eq!(json["type"], "asr-demucs");
    assert!(json["createdAt"].is_string());
    assert_eq!(json["queue"]["pending"], 2);
    assert_eq!(json["queue"]["running"], 1);
    assert!(json.get("finishedAt").is_none());
}

#[test]
fn terminal_job_dto_includes_error_record() {
    let clock = FakeClock::new();
    let mut job = Job::builder().state(JobState::Running).build();
    job.finalize_failure(JobError::engine("worker died"), &clock, 1_000);
    let dto = JobDto::from_job(&job, stats());
    assert_eq!(dto.state, "failed");
    assert_eq!(dto.phase, "error");
    assert_eq!(dto.error.as_ref().map(|e| e.code), Some(ErrorCode::EngineError));
    assert!(dto.finished_at.is_some());
    assert!(dto.expires_at.is_some());
}

#[test]
fn batch_dto_counts_and_item_urls() {
    let clock = FakeClock::new();
    let mut batch = Batch::builder().id("bat-7").state(BatchState::Running).build();
    let mut item = vox_core::BatchItem::builder().idx(1).build();
    item.publish(ArtifactKey::Srt, "items/1/output.srt".into(), 10);
    item.succeed(&clock);
    batch.items.push(vox_core::BatchItem::builder().idx(0).build());
    batch.items.push(item);

    let dto = BatchDto::from_batch(&batch);
    assert_eq!(dto.counts.total, 2);
    assert_eq!(dto.counts.succeeded, 1);
    let srt = &dto.items[1].artifacts["srt"];
    assert_eq!(srt.url.as_deref(), Some("/v2/batches/bat-7/items/1/artifacts/output.srt"));
}

#[test]
fn rfc3339_renders_epoch_ms() {
    let rendered = rfc3339(1_700_000_000_123);
    assert!(rendered.starts_with("2023-11-14T"));
    assert!(rendered.ends_with('Z'));
    assert!(rendered.contains(".123"));
}
