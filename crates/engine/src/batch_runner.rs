// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage-first batch runner.
//!
//! ASR runs for every item before any separation starts: the recognizer
//! amortizes its model load across the batch, and early SRTs become
//! downloadable while later items wait. One item's failure never stops
//! the loop. Cancellation is cooperative — the flag is read between
//! items, in-flight engine work is never interrupted.

use crate::job_runner::{
    file_size, release_owned_input, remove_dir_logged, remove_file_logged, RunnerCtx,
};
use crate::intake::move_file;
use crate::registry::Registry;
use std::path::Path;
use vox_adapters::{pack_zip, ZipEntry};
use vox_core::{
    ArtifactKey, Batch, BatchId, BatchPhase, Clock, ItemState, JobError, JobPhase,
};
use vox_store::{persist_batch, Layout};

/// Run a batch to a terminal state. Failures land on items (or, for
/// engine-level trouble, on the batch record); nothing is returned.
pub async fn run_batch<C: Clock>(ctx: &RunnerCtx<C>, id: &BatchId) {
    let Some(mut batch) = ctx.registry.batch(id.as_str()) else {
        tracing::warn!(batch_id = %id, "batch vanished before it could run");
        return;
    };
    if batch.is_terminal() {
        return;
    }

    tracing::info!(batch_id = %batch.id, items = batch.items.len(), "batch starting");
    batch.begin(&ctx.clock);
    checkpoint(ctx, &mut batch).await;

    let tasks = batch.options.tasks;
    let mut canceled = false;

    if tasks.asr {
        batch.phase = BatchPhase::Asr;
        checkpoint(ctx, &mut batch).await;
        for i in 0..batch.items.len() {
            if cancel_requested(&ctx.registry, &mut batch) {
                cancel_queued_items(ctx, &mut batch).await;
                canceled = true;
                break;
            }
            if batch.items[i].state != ItemState::Queued {
                continue;
            }
            run_item_asr(ctx, &mut batch, i, !tasks.demucs).await;
        }
    }

    if tasks.demucs && !canceled {
        batch.phase = BatchPhase::Demucs;
        checkpoint(ctx, &mut batch).await;
        for i in 0..batch.items.len() {
            if cancel_requested(&ctx.registry, &mut batch) {
                cancel_queued_items(ctx, &mut batch).await;
                break;
            }
            if batch.items[i].state != ItemState::Queued {
                continue;
            }
            run_item_demucs(ctx, &mut batch, i, tasks.asr).await;
        }
    }

    batch.finalize(&ctx.clock, ctx.ttl_ms);
    checkpoint(ctx, &mut batch).await;
    let counts = batch.counts();
    tracing::info!(
        batch_id = %batch.id,
        state = %batch.state,
        succeeded = counts.succeeded,
        failed = counts.failed,
        canceled = counts.canceled,
        "batch finished"
    );
}

/// Stage 1 for one item: transcode → recognize → publish `srt`. With no
/// separation stage to come the item finishes here; otherwise it parks
/// back in `queued` for stage 2.
async fn run_item_asr<C: Clock>(ctx: &RunnerCtx<C>, batch: &mut Batch, i: usize, asr_only: bool) {
    batch.items[i].begin(JobPhase::AsrConvert, &ctx.clock);
    checkpoint(ctx, batch).await;

    let result = item_asr_stages(ctx, batch, i).await;
    match result {
        Ok(()) => {
            if asr_only {
                finish_item(ctx, batch, i).await;
            } else {
                batch.items[i].requeue();
            }
        }
        Err(error) => {
            fail_item(ctx, batch, i, error).await;
        }
    }
    checkpoint(ctx, batch).await;
}

async fn item_asr_stages<C: Clock>(
    ctx: &RunnerCtx<C>,
    batch: &mut Batch,
    i: usize,
) -> Result<(), JobError> {
    let audio_path = item_audio(batch, i)?;
    let item_dir = Layout::batch_item_dir(&batch.out_dir, i);
    tokio::fs::create_dir_all(&item_dir).await.map_err(JobError::from)?;

    let wav = item_dir.join("asr.wav");
    ctx.engines.transcoder.to_wav_mono_16k(&audio_path, &wav).await?;

    batch.items[i].phase = JobPhase::Asr;
    checkpoint(ctx, batch).await;
    let vad = batch.options.vad;
    let recognition = ctx.engines.recognizer.recognize(&wav, &item_dir, vad).await?;

    let srt = item_dir.join(ArtifactKey::Srt.file_name());
    if recognition.srt_path != srt {
        move_file(&recognition.srt_path, &srt).await?;
    }
    let bytes = file_size(&srt).await?;
    batch.items[i].publish(ArtifactKey::Srt, srt, bytes);
    checkpoint(ctx, batch).await;

    remove_file_logged(&wav).await;
    Ok(())
}

/// Stage 2 for one item: separate → publish stems → `demucs.zip`, and the
/// combined `result.zip` when ASR ran too.
async fn run_item_demucs<C: Clock>(
    ctx: &RunnerCtx<C>,
    batch: &mut Batch,
    i: usize,
    with_asr: bool,
) {
    batch.items[i].begin(JobPhase::Demucs, &ctx.clock);
    checkpoint(ctx, batch).await;

    let result = item_demucs_stages(ctx, batch, i, with_asr).await;
    match result {
        Ok(()) => finish_item(ctx, batch, i).await,
        Err(error) => fail_item(ctx, batch, i, error).await,
    }
    checkpoint(ctx, batch).await;
}

async fn item_demucs_stages<C: Clock>(
    ctx: &RunnerCtx<C>,
    batch: &mut Batch,
    i: usize,
    with_asr: bool,
) -> Result<(), JobError> {
    let audio_path = item_audio(batch, i)?;
    let item_dir = Layout::batch_item_dir(&batch.out_dir, i);
    tokio::fs::create_dir_all(&item_dir).await.map_err(JobError::from)?;

    let raw_dir = item_dir.join("separated");
    tokio::fs::create_dir_all(&raw_dir).await.map_err(JobError::from)?;
    let stems = ctx.engines.separator.split(&audio_path, &raw_dir).await?;

    let vocals = item_dir.join(ArtifactKey::Vocals.file_name());
    move_file(&stems.vocals, &vocals).await?;
    let bytes = file_size(&vocals).await?;
    batch.items[i].publish(ArtifactKey::Vocals, vocals.clone(), bytes);
    checkpoint(ctx, batch).await;

    let no_vocals = item_dir.join(ArtifactKey::NoVocals.file_name());
    move_file(&stems.no_vocals, &no_vocals).await?;
    let bytes = file_size(&no_vocals).await?;
    batch.items[i].publish(ArtifactKey::NoVocals, no_vocals.clone(), bytes);
    checkpoint(ctx, batch).await;

    batch.items[i].phase = JobPhase::ZipDemucs;
    checkpoint(ctx, batch).await;
    let demucs_zip = item_dir.join(ArtifactKey::DemucsZip.file_name());
    pack_zip(
        &demucs_zip,
        vec![ZipEntry::new(&vocals, "vocals.mp3"), ZipEntry::new(&no_vocals, "no_vocals.mp3")],
    )
    .await?;
    let bytes = file_size(&demucs_zip).await?;
    batch.items[i].publish(ArtifactKey::DemucsZip, demucs_zip, bytes);
    checkpoint(ctx, batch).await;

    let srt_ready = batch.items[i]
        .artifacts
        .get(&ArtifactKey::Srt)
        .map(|a| (a.ready, a.path.clone()));
    if with_asr {
        if let Some((true, srt_path)) = srt_ready {
            batch.items[i].phase = JobPhase::ZipResult;
            checkpoint(ctx, batch).await;
            let result_zip = item_dir.join(ArtifactKey::ResultZip.file_name());
            pack_zip(
                &result_zip,
                vec![
                    ZipEntry::new(srt_path, "output.srt"),
                    ZipEntry::new(&vocals, "vocals.mp3"),
                    ZipEntry::new(&no_vocals, "no_vocals.mp3"),
                ],
            )
            .await?;
            let bytes = file_size(&result_zip).await?;
            batch.items[i].publish(ArtifactKey::ResultZip, result_zip, bytes);
            checkpoint(ctx, batch).await;
        }
    }

    remove_dir_logged(&raw_dir).await;
    Ok(())
}

fn item_audio(batch: &Batch, i: usize) -> Result<std::path::PathBuf, JobError> {
    batch.items[i]
        .audio_path
        .clone()
        .ok_or_else(|| JobError::bad_request("item has no audio input"))
}

async fn finish_item<C: Clock>(ctx: &RunnerCtx<C>, batch: &mut Batch, i: usize) {
    batch.items[i].succeed(&ctx.clock);
    release_item_input(batch, i).await;
}

async fn fail_item<C: Clock>(ctx: &RunnerCtx<C>, batch: &mut Batch, i: usize, error: JobError) {
    tracing::warn!(
        batch_id = %batch.id,
        item = i,
        code = %error.code,
        error = %error.message,
        "batch item failed"
    );
    batch.items[i].fail(error, &ctx.clock);
    release_item_input(batch, i).await;
}

/// Mark everything still waiting as canceled; in-flight work has already
/// reached its natural stage end by the time this runs.
async fn cancel_queued_items<C: Clock>(ctx: &RunnerCtx<C>, batch: &mut Batch) {
    tracing::info!(batch_id = %batch.id, "cancel requested; canceling queued items");
    for i in 0..batch.items.len() {
        if batch.items[i].state == ItemState::Queued {
            batch.items[i].cancel(&ctx.clock);
            release_item_input(batch, i).await;
        }
    }
}

async fn release_item_input(batch: &mut Batch, i: usize) {
    let item = &batch.items[i];
    release_owned_input(item.owned_input, item.audio_path.as_deref()).await;
}

/// Mirror the cancel endpoint's flag into the runner's working copy.
fn cancel_requested(registry: &Registry, batch: &mut Batch) -> bool {
    batch.cancel_requested |= registry.batch_cancel_requested(batch.id.as_str());
    batch.cancel_requested
}

async fn checkpoint<C: Clock>(ctx: &RunnerCtx<C>, batch: &mut Batch) {
    ctx.registry.update_batch(batch);
    if let Err(e) = persist_batch(batch).await {
        tracing::error!(batch_id = %batch.id, error = %e, "failed to persist batch metadata");
    }
}

#[cfg(test)]
#[path = "batch_runner_tests.rs"]
mod tests;
