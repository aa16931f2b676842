// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash/restart specs: interrupted records are failed, never resumed.

use super::prelude::*;
use vox_core::{Job, JobId, JobPhase, JobState, JobType};
use vox_store::{persist_job, Layout};

/// S7: the host dies between `asr_convert` and `asr`. After restart the
/// job is loaded as `failed`/`internal_error` with the restart message,
/// terminal timestamps set, and partial files still on disk.
#[tokio::test]
async fn interrupted_job_is_failed_on_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let layout = Layout::new(tmp.path().join("state"));

    // First life: a job that got as far as transcoding.
    let id = JobId::new("job-interrupted");
    let out_dir = layout.job_dir(&id);
    tokio::fs::create_dir_all(&out_dir).await.unwrap();
    let mut job = Job::new(id.clone(), JobType::Asr, out_dir.clone(), &clock);
    let input = out_dir.join("input.wav");
    tokio::fs::write(&input, b"riff-data").await.unwrap();
    job.set_input(input.clone(), vox_core::InputSource::Upload, true);
    job.begin(&clock);
    job.phase = JobPhase::AsrConvert;
    persist_job(&job).await.unwrap();
    // Partial intermediate from the interrupted stage.
    tokio::fs::write(out_dir.join("asr.wav"), b"partial").await.unwrap();

    // Second life.
    let service = boot(tmp.path()).await;

    let dto = service.job_status(id.as_str()).unwrap();
    assert_eq!(dto.state, "failed");
    assert_eq!(dto.phase, "error");
    let error = dto.error.as_ref().unwrap();
    assert_eq!(error.code, ErrorCode::InternalError);
    assert!(error.message.contains("interrupted by server restart"));
    assert!(dto.finished_at.is_some());
    assert!(dto.expires_at.is_some());

    // No resume: partial files remain until the TTL sweep.
    assert!(out_dir.join("asr.wav").exists());
    assert!(input.exists());

    // Durable too, not just in memory.
    let reloaded = vox_store::load_job(&out_dir).await.unwrap();
    assert_eq!(reloaded.state, JobState::Failed);
}

/// A terminal record whose TTL has passed is deleted by the startup
/// sweep; a live one is reloaded into memory.
#[tokio::test]
async fn startup_sweep_separates_live_from_expired() {
    let tmp = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let layout = Layout::new(tmp.path().join("state"));

    let expired_id = JobId::new("job-expired");
    let expired_dir = layout.job_dir(&expired_id);
    tokio::fs::create_dir_all(&expired_dir).await.unwrap();
    let mut expired = Job::new(expired_id.clone(), JobType::Asr, expired_dir.clone(), &clock);
    expired.finalize_success(&clock, 0);
    persist_job(&expired).await.unwrap();

    let live_id = JobId::new("job-live");
    let live_dir = layout.job_dir(&live_id);
    tokio::fs::create_dir_all(&live_dir).await.unwrap();
    let mut live = Job::new(live_id.clone(), JobType::Asr, live_dir.clone(), &clock);
    live.finalize_success(&clock, 21_600_000);
    persist_job(&live).await.unwrap();

    let service = boot(tmp.path()).await;

    assert_eq!(service.job_status(expired_id.as_str()).unwrap_err().code, ErrorCode::NotFound);
    assert!(!expired_dir.exists());
    assert_eq!(service.job_status(live_id.as_str()).unwrap().state, "succeeded");
    assert!(live_dir.exists());
}

/// The reaper drops records whose TTL passes while the process runs.
#[tokio::test]
async fn reaper_removes_records_when_the_ttl_passes() {
    let tmp = tempfile::tempdir().unwrap();
    let service = boot(tmp.path()).await;

    let input = tmp.path().join("song.wav");
    tokio::fs::write(&input, b"riff-data").await.unwrap();
    let created = service
        .create_job(job_request("asr", InputDescriptor::AudioPath { path: input }))
        .await
        .unwrap();
    wait_terminal_job(&service, &created.job_id).await;

    // Not expired yet.
    service.sweep_now().await;
    assert!(service.job_status(&created.job_id).is_ok());

    // FakeClock: jump past the TTL and sweep again.
    service.clock().advance(Duration::from_secs(21_601));
    service.sweep_now().await;
    assert_eq!(service.job_status(&created.job_id).unwrap_err().code, ErrorCode::NotFound);
}
