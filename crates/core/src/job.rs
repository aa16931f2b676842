// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record and state machine.
//!
//! A job is a single-item pipeline run. The engine advances `phase` through
//! the stage sequence for its type and persists the record after every
//! transition, so polling clients observe progress and artifacts as soon as
//! they are durable.

use crate::artifact::{Artifact, ArtifactKey, ArtifactMap};
use crate::clock::Clock;
use crate::error::JobError;
use crate::input::InputSource;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a job.
    pub struct JobId("job-");
}

/// Which engines a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    Asr,
    Demucs,
    AsrDemucs,
}

crate::simple_display! {
    JobType {
        Asr => "asr",
        Demucs => "demucs",
        AsrDemucs => "asr-demucs",
    }
}

impl JobType {
    /// Parse a client-supplied type string.
    ///
    /// Aliases of the combined pipeline (`demucs-asr`, `demucsasr`,
    /// `asr+demucs`, empty) map to [`JobType::AsrDemucs`]; anything else is
    /// rejected with `bad_request`.
    pub fn parse(s: &str) -> Result<Self, JobError> {
        match s.trim() {
            "asr" => Ok(JobType::Asr),
            "demucs" => Ok(JobType::Demucs),
            "asr-demucs" | "demucs-asr" | "demucsasr" | "asr+demucs" | "" => Ok(JobType::AsrDemucs),
            other => Err(JobError::bad_request(format!("unknown job type: {other:?}"))),
        }
    }

    pub fn wants_asr(&self) -> bool {
        matches!(self, JobType::Asr | JobType::AsrDemucs)
    }

    pub fn wants_demucs(&self) -> bool {
        matches!(self, JobType::Demucs | JobType::AsrDemucs)
    }
}

/// Coarse job state, as surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

crate::simple_display! {
    JobState {
        Queued => "queued",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
    }
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// Fine-grained pipeline progress within a `running` state.
///
/// Also used for batch items, which step through the same stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Queued,
    AsrConvert,
    Asr,
    Demucs,
    ZipDemucs,
    ZipResult,
    Done,
    Error,
}

crate::simple_display! {
    JobPhase {
        Queued => "queued",
        AsrConvert => "asr_convert",
        Asr => "asr",
        Demucs => "demucs",
        ZipDemucs => "zip_demucs",
        ZipResult => "zip_result",
        Done => "done",
        Error => "error",
    }
}

/// Optional VAD tuning forwarded to the recognizer.
///
/// Serialized with the wire names the recognizer and the HTTP surface use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VadTuning {
    #[serde(
        rename = "vadMaxSingleSegmentMs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub max_single_segment_ms: Option<u32>,
    #[serde(
        rename = "vadMaxEndSilenceMs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub max_end_silence_ms: Option<u32>,
}

impl VadTuning {
    /// Validate client-supplied raw values. Both must be positive integers
    /// when present.
    pub fn from_raw(
        max_single_segment_ms: Option<i64>,
        max_end_silence_ms: Option<i64>,
    ) -> Result<Self, JobError> {
        Ok(Self {
            max_single_segment_ms: positive(max_single_segment_ms, "vadMaxSingleSegmentMs")?,
            max_end_silence_ms: positive(max_end_silence_ms, "vadMaxEndSilenceMs")?,
        })
    }
}

fn positive(v: Option<i64>, name: &str) -> Result<Option<u32>, JobError> {
    match v {
        None => Ok(None),
        Some(n) if n > 0 && n <= u32::MAX as i64 => Ok(Some(n as u32)),
        Some(n) => Err(JobError::bad_request(format!("{name} must be a positive integer, got {n}"))),
    }
}

/// A single-item pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub state: JobState,
    pub phase: JobPhase,
    /// Epoch milliseconds.
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    /// Absolute path to the per-job directory. Rewritten at load if the
    /// directory moved between hosts.
    pub out_dir: PathBuf,
    pub source: InputSource,
    /// Absolute path to the input this job reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<PathBuf>,
    /// True when the core owns the input file and deletes it at terminal
    /// transition.
    #[serde(default)]
    pub cleanup_audio_on_finish: bool,
    #[serde(flatten)]
    pub vad: VadTuning,
    #[serde(default)]
    pub artifacts: ArtifactMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl Job {
    /// Create a queued job with no input attached yet.
    pub fn new(id: JobId, job_type: JobType, out_dir: PathBuf, clock: &impl Clock) -> Self {
        Self {
            id,
            job_type,
            state: JobState::Queued,
            phase: JobPhase::Queued,
            created_at: clock.epoch_ms(),
            started_at: None,
            finished_at: None,
            expires_at: None,
            out_dir,
            source: InputSource::Unknown,
            audio_path: None,
            cleanup_audio_on_finish: false,
            vad: VadTuning::default(),
            artifacts: ArtifactMap::new(),
            error: None,
        }
    }

    /// Attach the materialized input.
    pub fn set_input(&mut self, path: PathBuf, source: InputSource, owned: bool) {
        self.audio_path = Some(path);
        self.source = source;
        self.cleanup_audio_on_finish = owned;
    }

    /// Enter the running state.
    pub fn begin(&mut self, clock: &impl Clock) {
        self.state = JobState::Running;
        self.started_at = Some(clock.epoch_ms());
    }

    /// Record a published artifact as ready.
    pub fn publish(&mut self, key: ArtifactKey, path: PathBuf, bytes: u64) {
        self.artifacts.insert(key, Artifact::ready(key, path, bytes));
    }

    /// Terminal success: `succeeded`/`done`, finished and expiry stamped.
    pub fn finalize_success(&mut self, clock: &impl Clock, ttl_ms: u64) {
        let now = clock.epoch_ms();
        self.state = JobState::Succeeded;
        self.phase = JobPhase::Done;
        self.finished_at = Some(now);
        self.expires_at = Some(now + ttl_ms);
    }

    /// Terminal failure: `failed`/`error`, error recorded, expiry stamped.
    /// Artifacts published before the failing stage stay available.
    pub fn finalize_failure(&mut self, error: JobError, clock: &impl Clock, ttl_ms: u64) {
        let now = clock.epoch_ms();
        self.state = JobState::Failed;
        self.phase = JobPhase::Error;
        self.error = Some(error);
        self.finished_at = Some(now);
        self.expires_at = Some(now + ttl_ms);
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            id: JobId = "job-test1",
            out_dir: PathBuf = "/tmp/vox-test/job-test1",
        }
        set {
            job_type: JobType = JobType::Asr,
            state: JobState = JobState::Queued,
            phase: JobPhase = JobPhase::Queued,
            created_at: u64 = 1_000_000,
            source: InputSource = InputSource::Unknown,
            cleanup_audio_on_finish: bool = false,
            vad: VadTuning = VadTuning::default(),
            artifacts: ArtifactMap = ArtifactMap::new(),
        }
        option {
            started_at: u64 = None,
            finished_at: u64 = None,
            expires_at: u64 = None,
            audio_path: PathBuf = None,
            error: JobError = None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
