// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The facade the HTTP transport calls.
//!
//! Creation validates, materializes the input into the owning directory,
//! persists the initial record, and enqueues the run on the serial queue —
//! then returns immediately (the transport answers `202 Accepted`).
//! Status reads are value snapshots; they never block on engine work.

use crate::dto::{BatchCreated, BatchDto, JobCreated, JobDto};
use crate::env::Config;
use std::path::PathBuf;
use std::sync::Arc;
use vox_adapters::{AsrSupervisor, AsrWorkerConfig, Separator, Transcoder};
use vox_core::{
    Batch, BatchId, BatchOptions, BatchPolicy, BatchTasks, Clock, InputDescriptor, Job, JobError,
    JobId, JobType, SystemClock, VadTuning, MAX_BATCH_ITEMS,
};
use vox_engine::{
    materialize, run_batch, run_job, spawn_reaper, Engines, IntakePolicy, QueueStats, Registry,
    RunnerCtx, SerialQueue,
};
use vox_store::{persist_batch, persist_job, reap_dir, sweep_on_startup, Layout};

/// One job, as received from the transport after multipart decoding.
#[derive(Debug, Clone)]
pub struct NewJobRequest {
    /// Raw client-supplied type string (aliases accepted).
    pub job_type: String,
    pub input: InputDescriptor,
    pub vad_max_single_segment_ms: Option<i64>,
    pub vad_max_end_silence_ms: Option<i64>,
}

/// One batch, 1..=10 inputs under a single stage-first policy.
#[derive(Debug, Clone)]
pub struct NewBatchRequest {
    pub tasks: BatchTasks,
    pub inputs: Vec<InputDescriptor>,
    pub vad_max_single_segment_ms: Option<i64>,
    pub vad_max_end_silence_ms: Option<i64>,
}

/// Orchestrator facade. One per process.
pub struct MediaService<C: Clock = SystemClock> {
    ctx: RunnerCtx<C>,
    queue: SerialQueue,
    layout: Layout,
    http: reqwest::Client,
    policy: IntakePolicy,
    reaper: tokio::task::JoinHandle<()>,
}

impl MediaService<SystemClock> {
    /// Bring the orchestrator up with the real engines: ensure the
    /// layout, sweep leftovers from the previous run, start the reaper.
    pub async fn start(config: Config) -> Result<Self, JobError> {
        let engines = Engines {
            transcoder: Transcoder::new(&config.ffmpeg_bin),
            separator: Separator::new(
                &config.demucs_bin,
                config.demucs_mp3_bitrate,
                config.demucs_jobs,
            ),
            recognizer: Arc::new(AsrSupervisor::new(AsrWorkerConfig {
                command: config.asr_worker_cmd.clone(),
                idle_seconds: config.asr_idle_seconds,
            })),
        };
        Self::with_engines(config, SystemClock, Arc::new(engines)).await
    }
}

impl<C: Clock> MediaService<C> {
    /// Bring the orchestrator up against caller-supplied engines (tests
    /// substitute stubs here).
    pub async fn with_engines(
        config: Config,
        clock: C,
        engines: Arc<Engines>,
    ) -> Result<Self, JobError> {
        let layout = Layout::new(&config.tmp_dir);
        layout.ensure().await.map_err(JobError::from)?;

        let report = sweep_on_startup(&layout, &clock, config.ttl_ms()).await;
        let registry = Registry::new();
        registry.load(report.jobs, report.batches);

        let ctx = RunnerCtx { registry, engines, clock, ttl_ms: config.ttl_ms() };
        let reaper = spawn_reaper(ctx.registry.clone(), ctx.clock.clone());

        Ok(Self {
            ctx,
            queue: SerialQueue::new(),
            layout,
            http: reqwest::Client::new(),
            policy: IntakePolicy { max_download_bytes: config.max_download_bytes },
            reaper,
        })
    }

    /// Validate, materialize, persist, enqueue. Returns the `202` body.
    pub async fn create_job(&self, request: NewJobRequest) -> Result<JobCreated, JobError> {
        let job_type = JobType::parse(&request.job_type)?;
        let vad = VadTuning::from_raw(
            request.vad_max_single_segment_ms,
            request.vad_max_end_silence_ms,
        )?;

        let id = JobId::generate();
        let out_dir = self.layout.job_dir(&id);
        tokio::fs::create_dir_all(&out_dir).await.map_err(JobError::from)?;

        let dest = out_dir.join(format!("input.{}", request.input.extension()));
        let input = match materialize(&request.input, &dest, &self.http, self.policy).await {
            Ok(input) => input,
            Err(e) => {
                reap_dir(&out_dir).await;
                return Err(e);
            }
        };

        let mut job = Job::new(id.clone(), job_type, out_dir, &self.ctx.clock);
        job.vad = vad;
        job.set_input(input.path, input.source, input.owned);
        persist_job(&job).await?;
        self.ctx.registry.insert_job(job);

        let ctx = self.ctx.clone();
        let run_id = id.clone();
        self.queue.submit(async move {
            run_job(&ctx, &run_id).await;
        });

        tracing::info!(job_id = %id, job_type = %job_type, "job accepted");
        Ok(JobCreated { job_id: id.to_string(), status_url: format!("/v2/jobs/{id}") })
    }

    /// Validate, materialize every input, persist, enqueue.
    pub async fn create_batch(&self, request: NewBatchRequest) -> Result<BatchCreated, JobError> {
        if request.inputs.is_empty() || request.inputs.len() > MAX_BATCH_ITEMS {
            return Err(JobError::bad_request(format!(
                "items must contain 1..={MAX_BATCH_ITEMS} entries, got {}",
                request.inputs.len()
            )));
        }
        if !request.tasks.asr && !request.tasks.demucs {
            return Err(JobError::bad_request("batch tasks must enable asr or demucs"));
        }
        let vad = VadTuning::from_raw(
            request.vad_max_single_segment_ms,
            request.vad_max_end_silence_ms,
        )?;

        let id = BatchId::generate();
        let out_dir = self.layout.batch_dir(&id);
        tokio::fs::create_dir_all(out_dir.join("inputs")).await.map_err(JobError::from)?;

        let options =
            BatchOptions { policy: BatchPolicy::StageFirst, tasks: request.tasks, vad };
        let mut batch = Batch::new(
            id.clone(),
            out_dir.clone(),
            options,
            request.inputs.clone(),
            &self.ctx.clock,
        );

        for (idx, descriptor) in request.inputs.iter().enumerate() {
            let dest = Layout::batch_input_path(&out_dir, idx, &descriptor.extension());
            match materialize(descriptor, &dest, &self.http, self.policy).await {
                Ok(input) => batch.items[idx].set_input_path(input.path, input.owned),
                Err(e) => {
                    // Creation is all-or-nothing; release what landed.
                    reap_dir(&out_dir).await;
                    return Err(e);
                }
            }
        }

        persist_batch(&batch).await?;
        self.ctx.registry.insert_batch(batch);

        let ctx = self.ctx.clone();
        let run_id = id.clone();
        self.queue.submit(async move {
            run_batch(&ctx, &run_id).await;
        });

        tracing::info!(batch_id = %id, items = request.inputs.len(), "batch accepted");
        Ok(BatchCreated { batch_id: id.to_string(), status_url: format!("/v2/batches/{id}") })
    }

    /// Status snapshot of one job.
    pub fn job_status(&self, id: &str) -> Result<JobDto, JobError> {
        self.ctx
            .registry
            .job(id)
            .map(|job| JobDto::from_job(&job, self.queue.stats()))
            .ok_or_else(|| JobError::not_found("Job not found"))
    }

    /// Status snapshot of one batch.
    pub fn batch_status(&self, id: &str) -> Result<BatchDto, JobError> {
        self.ctx
            .registry
            .batch(id)
            .map(|batch| BatchDto::from_batch(&batch))
            .ok_or_else(|| JobError::not_found("Batch not found"))
    }

    /// Cooperative cancel. A terminal batch is a no-op returning its
    /// current state; an unknown one is `not_found`.
    pub fn cancel_batch(&self, id: &str) -> Result<BatchDto, JobError> {
        self.ctx
            .registry
            .request_batch_cancel(id)
            .map(|batch| BatchDto::from_batch(&batch))
            .ok_or_else(|| JobError::not_found("Batch not found"))
    }

    /// Resolve a job artifact for download, gated on readiness.
    pub fn job_artifact(&self, id: &str, name: &str) -> Result<PathBuf, JobError> {
        let job =
            self.ctx.registry.job(id).ok_or_else(|| JobError::not_found("Job not found"))?;
        resolve_artifact(job.artifacts.values(), name)
    }

    /// Resolve a batch item artifact for download.
    pub fn batch_item_artifact(
        &self,
        id: &str,
        idx: usize,
        name: &str,
    ) -> Result<PathBuf, JobError> {
        let batch =
            self.ctx.registry.batch(id).ok_or_else(|| JobError::not_found("Batch not found"))?;
        let item = batch
            .items
            .get(idx)
            .ok_or_else(|| JobError::not_found(format!("Batch item {idx} not found")))?;
        resolve_artifact(item.artifacts.values(), name)
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// The service clock (tests drive a `FakeClock` through this).
    pub fn clock(&self) -> &C {
        &self.ctx.clock
    }

    /// Run one reaper pass immediately (the background loop also runs
    /// every minute).
    pub async fn sweep_now(&self) {
        vox_engine::sweep_expired(&self.ctx.registry, &self.ctx.clock).await;
    }
}

fn resolve_artifact<'a>(
    artifacts: impl Iterator<Item = &'a vox_core::Artifact>,
    name: &str,
) -> Result<PathBuf, JobError> {
    artifacts
        .filter(|a| a.name == name && a.ready)
        .map(|a| a.path.clone())
        .next()
        .ok_or_else(|| JobError::not_found("Artifact not found (or not ready yet)"))
}

impl<C: Clock> Drop for MediaService<C> {
    fn drop(&mut self) {
        self.reaper.abort();
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
