// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-item pipeline runner.
//!
//! Drives one job through the stage sequence for its type, persisting
//! after every transition so artifacts become visible to polling clients
//! as soon as they are durable. Errors are caught at stage boundaries,
//! classified, and recorded on the job; artifacts published before the
//! failing stage remain available.

use crate::intake::move_file;
use crate::registry::Registry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vox_adapters::{pack_zip, Recognizer, Separator, Transcoder, ZipEntry};
use vox_core::{ArtifactKey, Clock, Job, JobError, JobId, JobPhase, JobType};
use vox_store::persist_job;

/// The four engine shims the runners drive.
pub struct Engines {
    pub transcoder: Transcoder,
    pub separator: Separator,
    pub recognizer: Arc<dyn Recognizer>,
}

/// Everything a runner task needs; cheap to clone into queue tasks.
#[derive(Clone)]
pub struct RunnerCtx<C: Clock> {
    pub registry: Registry,
    pub engines: Arc<Engines>,
    pub clock: C,
    pub ttl_ms: u64,
}

/// Run a job to a terminal state. Never returns an error: failures are
/// recorded on the job record itself.
pub async fn run_job<C: Clock>(ctx: &RunnerCtx<C>, id: &JobId) {
    let Some(mut job) = ctx.registry.job(id.as_str()) else {
        tracing::warn!(job_id = %id, "job vanished before it could run");
        return;
    };
    if job.is_terminal() {
        return;
    }

    tracing::info!(job_id = %job.id, job_type = %job.job_type, "job starting");
    job.begin(&ctx.clock);
    checkpoint(ctx, &mut job).await;

    let result = run_stages(ctx, &mut job).await;
    match result {
        Ok(()) => {
            job.finalize_success(&ctx.clock, ctx.ttl_ms);
            tracing::info!(job_id = %job.id, "job succeeded");
        }
        Err(error) => {
            tracing::warn!(job_id = %job.id, code = %error.code, error = %error.message, "job failed");
            job.finalize_failure(error, &ctx.clock, ctx.ttl_ms);
        }
    }
    checkpoint(ctx, &mut job).await;
    release_owned_input(job.cleanup_audio_on_finish, job.audio_path.as_deref()).await;
}

async fn run_stages<C: Clock>(ctx: &RunnerCtx<C>, job: &mut Job) -> Result<(), JobError> {
    let Some(audio_path) = job.audio_path.clone() else {
        return Err(JobError::bad_request("job has no audio input"));
    };

    if job.job_type.wants_asr() {
        run_asr_stage(ctx, job, &audio_path).await?;
    }
    if job.job_type.wants_demucs() {
        run_demucs_stage(ctx, job, &audio_path).await?;
    }
    if job.job_type == JobType::AsrDemucs {
        run_result_zip_stage(ctx, job).await?;
    }
    Ok(())
}

/// transcode → recognize → publish `srt`, then drop the intermediate WAV.
async fn run_asr_stage<C: Clock>(
    ctx: &RunnerCtx<C>,
    job: &mut Job,
    audio_path: &Path,
) -> Result<(), JobError> {
    job.phase = JobPhase::AsrConvert;
    checkpoint(ctx, job).await;
    let wav = job.out_dir.join("asr.wav");
    ctx.engines.transcoder.to_wav_mono_16k(audio_path, &wav).await?;

    job.phase = JobPhase::Asr;
    checkpoint(ctx, job).await;
    let recognition = ctx.engines.recognizer.recognize(&wav, &job.out_dir, job.vad).await?;

    // The worker picks its own SRT location; pin it to the stable name.
    let srt = job.out_dir.join(ArtifactKey::Srt.file_name());
    if recognition.srt_path != srt {
        move_file(&recognition.srt_path, &srt).await?;
    }
    let bytes = file_size(&srt).await?;
    job.publish(ArtifactKey::Srt, srt, bytes);
    checkpoint(ctx, job).await;

    remove_file_logged(&wav).await;
    Ok(())
}

/// separate → publish stems → pack `demucs.zip`, then drop the raw tree.
async fn run_demucs_stage<C: Clock>(
    ctx: &RunnerCtx<C>,
    job: &mut Job,
    audio_path: &Path,
) -> Result<(), JobError> {
    job.phase = JobPhase::Demucs;
    checkpoint(ctx, job).await;
    let raw_dir = job.out_dir.join("separated");
    tokio::fs::create_dir_all(&raw_dir).await.map_err(JobError::from)?;
    let stems = ctx.engines.separator.split(audio_path, &raw_dir).await?;

    let vocals = job.out_dir.join(ArtifactKey::Vocals.file_name());
    move_file(&stems.vocals, &vocals).await?;
    let bytes = file_size(&vocals).await?;
    job.publish(ArtifactKey::Vocals, vocals.clone(), bytes);
    checkpoint(ctx, job).await;

    let no_vocals = job.out_dir.join(ArtifactKey::NoVocals.file_name());
    move_file(&stems.no_vocals, &no_vocals).await?;
    let bytes = file_size(&no_vocals).await?;
    job.publish(ArtifactKey::NoVocals, no_vocals.clone(), bytes);
    checkpoint(ctx, job).await;

    job.phase = JobPhase::ZipDemucs;
    checkpoint(ctx, job).await;
    let zip = job.out_dir.join(ArtifactKey::DemucsZip.file_name());
    pack_zip(
        &zip,
        vec![ZipEntry::new(&vocals, "vocals.mp3"), ZipEntry::new(&no_vocals, "no_vocals.mp3")],
    )
    .await?;
    let bytes = file_size(&zip).await?;
    job.publish(ArtifactKey::DemucsZip, zip, bytes);
    checkpoint(ctx, job).await;

    remove_dir_logged(&raw_dir).await;
    Ok(())
}

/// Bundle SRT + stems into `result.zip` for the combined pipeline.
async fn run_result_zip_stage<C: Clock>(ctx: &RunnerCtx<C>, job: &mut Job) -> Result<(), JobError> {
    job.phase = JobPhase::ZipResult;
    checkpoint(ctx, job).await;
    let entries = vec![
        ZipEntry::new(artifact_path(job, ArtifactKey::Srt)?, "output.srt"),
        ZipEntry::new(artifact_path(job, ArtifactKey::Vocals)?, "vocals.mp3"),
        ZipEntry::new(artifact_path(job, ArtifactKey::NoVocals)?, "no_vocals.mp3"),
    ];
    let zip = job.out_dir.join(ArtifactKey::ResultZip.file_name());
    pack_zip(&zip, entries).await?;
    let bytes = file_size(&zip).await?;
    job.publish(ArtifactKey::ResultZip, zip, bytes);
    checkpoint(ctx, job).await;
    Ok(())
}

fn artifact_path(job: &Job, key: ArtifactKey) -> Result<PathBuf, JobError> {
    job.artifacts
        .get(&key)
        .filter(|a| a.ready)
        .map(|a| a.path.clone())
        .ok_or_else(|| JobError::internal(format!("artifact {key} missing before bundling")))
}

/// Update the in-memory record and persist it. Persist failures are
/// logged; the in-memory record still advances so status stays live.
async fn checkpoint<C: Clock>(ctx: &RunnerCtx<C>, job: &mut Job) {
    ctx.registry.update_job(job);
    if let Err(e) = persist_job(job).await {
        tracing::error!(job_id = %job.id, error = %e, "failed to persist job metadata");
    }
}

pub(crate) async fn release_owned_input(owned: bool, audio_path: Option<&Path>) {
    if !owned {
        return;
    }
    let Some(path) = audio_path else { return };
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "owned input released"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to release owned input"),
    }
}

pub(crate) async fn file_size(path: &Path) -> Result<u64, JobError> {
    Ok(tokio::fs::metadata(path).await.map_err(JobError::from)?.len())
}

pub(crate) async fn remove_file_logged(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove intermediate");
        }
    }
}

pub(crate) async fn remove_dir_logged(path: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove intermediate tree");
        }
    }
}

#[cfg(test)]
#[path = "job_runner_tests.rs"]
mod tests;
