// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch record: up to [`MAX_BATCH_ITEMS`] items processed stage-first.
//!
//! The batch engine runs ASR for every item before any separation starts,
//! so early SRTs are downloadable while later items are still queued.
//! Per-item failures are isolated; cancellation is cooperative.

use crate::artifact::{Artifact, ArtifactKey, ArtifactMap};
use crate::clock::Clock;
use crate::error::JobError;
use crate::input::{InputDescriptor, InputSource};
use crate::job::{JobPhase, VadTuning};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a batch.
    pub struct BatchId("bat-");
}

/// Upper bound on `items[]` length, enforced at creation.
pub const MAX_BATCH_ITEMS: usize = 10;

/// Coarse batch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

crate::simple_display! {
    BatchState {
        Queued => "queued",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Canceled => "canceled",
    }
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Succeeded | BatchState::Failed | BatchState::Canceled)
    }
}

/// Stage the batch engine is currently driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    Validate,
    Asr,
    Demucs,
    Done,
    Error,
}

crate::simple_display! {
    BatchPhase {
        Validate => "validate",
        Asr => "asr",
        Demucs => "demucs",
        Done => "done",
        Error => "error",
    }
}

/// Per-item state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

crate::simple_display! {
    ItemState {
        Queued => "queued",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Canceled => "canceled",
    }
}

/// Scheduling policy. Only stage-first is supported: the ASR worker
/// amortizes model load across items, and separation is independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchPolicy {
    #[default]
    #[serde(rename = "stage-first")]
    StageFirst,
}

/// Which stages the batch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTasks {
    pub asr: bool,
    pub demucs: bool,
}

/// Batch-wide options, shared by every item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    pub policy: BatchPolicy,
    pub tasks: BatchTasks,
    #[serde(flatten)]
    pub vad: VadTuning,
}

/// One input inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub idx: usize,
    pub input: InputDescriptor,
    pub source: InputSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<PathBuf>,
    #[serde(default)]
    pub owned_input: bool,
    pub state: ItemState,
    pub phase: JobPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<u64>,
    #[serde(default)]
    pub artifacts: ArtifactMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl BatchItem {
    pub fn new(idx: usize, input: InputDescriptor) -> Self {
        let source = input.source();
        Self {
            idx,
            input,
            source,
            audio_path: None,
            owned_input: false,
            state: ItemState::Queued,
            phase: JobPhase::Queued,
            started_at: None,
            finished_at: None,
            artifacts: ArtifactMap::new(),
            error: None,
        }
    }

    /// Attach the materialized input.
    pub fn set_input_path(&mut self, path: PathBuf, owned: bool) {
        self.audio_path = Some(path);
        self.owned_input = owned;
    }

    /// Enter the running state (first time only stamps `startedAt`).
    pub fn begin(&mut self, phase: JobPhase, clock: &impl Clock) {
        self.state = ItemState::Running;
        self.phase = phase;
        if self.started_at.is_none() {
            self.started_at = Some(clock.epoch_ms());
        }
    }

    /// Record a published artifact as ready.
    pub fn publish(&mut self, key: ArtifactKey, path: PathBuf, bytes: u64) {
        self.artifacts.insert(key, Artifact::ready(key, path, bytes));
    }

    /// Park the item for the next stage after finishing one.
    pub fn requeue(&mut self) {
        self.state = ItemState::Queued;
        self.phase = JobPhase::Queued;
    }

    pub fn succeed(&mut self, clock: &impl Clock) {
        self.state = ItemState::Succeeded;
        self.phase = JobPhase::Done;
        self.finished_at = Some(clock.epoch_ms());
    }

    pub fn fail(&mut self, error: JobError, clock: &impl Clock) {
        self.state = ItemState::Failed;
        self.phase = JobPhase::Error;
        self.error = Some(error);
        self.finished_at = Some(clock.epoch_ms());
    }

    pub fn cancel(&mut self, clock: &impl Clock) {
        self.state = ItemState::Canceled;
        self.phase = JobPhase::Done;
        self.finished_at = Some(clock.epoch_ms());
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, ItemState::Succeeded | ItemState::Failed | ItemState::Canceled)
    }
}

/// Aggregate item tallies, surfaced on batch status responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub canceled: usize,
}

/// A multi-item run under a single policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: BatchId,
    pub state: BatchState,
    pub phase: BatchPhase,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    pub out_dir: PathBuf,
    pub options: BatchOptions,
    pub items: Vec<BatchItem>,
    #[serde(default)]
    pub cancel_requested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl Batch {
    pub fn new(
        id: BatchId,
        out_dir: PathBuf,
        options: BatchOptions,
        inputs: Vec<InputDescriptor>,
        clock: &impl Clock,
    ) -> Self {
        let items = inputs.into_iter().enumerate().map(|(i, d)| BatchItem::new(i, d)).collect();
        Self {
            id,
            state: BatchState::Queued,
            phase: BatchPhase::Validate,
            created_at: clock.epoch_ms(),
            started_at: None,
            finished_at: None,
            expires_at: None,
            out_dir,
            options,
            items,
            cancel_requested: false,
            error: None,
        }
    }

    /// Enter the running state.
    pub fn begin(&mut self, clock: &impl Clock) {
        self.state = BatchState::Running;
        self.phase = BatchPhase::Validate;
        self.started_at = Some(clock.epoch_ms());
    }

    pub fn counts(&self) -> BatchCounts {
        let mut c = BatchCounts { total: self.items.len(), succeeded: 0, failed: 0, canceled: 0 };
        for item in &self.items {
            match item.state {
                ItemState::Succeeded => c.succeeded += 1,
                ItemState::Failed => c.failed += 1,
                ItemState::Canceled => c.canceled += 1,
                _ => {}
            }
        }
        c
    }

    /// Terminal classification after the stage loops finish:
    /// `canceled` if any item was canceled and none failed, `failed` if any
    /// item failed, else `succeeded`.
    pub fn finalize(&mut self, clock: &impl Clock, ttl_ms: u64) {
        let counts = self.counts();
        self.state = if counts.failed > 0 {
            BatchState::Failed
        } else if counts.canceled > 0 {
            BatchState::Canceled
        } else {
            BatchState::Succeeded
        };
        self.phase = BatchPhase::Done;
        let now = clock.epoch_ms();
        self.finished_at = Some(now);
        self.expires_at = Some(now + ttl_ms);
    }

    /// Engine-level failure (not an item failure): `failed`/`error`.
    pub fn finalize_failure(&mut self, error: JobError, clock: &impl Clock, ttl_ms: u64) {
        self.state = BatchState::Failed;
        self.phase = BatchPhase::Error;
        self.error = Some(error);
        let now = clock.epoch_ms();
        self.finished_at = Some(now);
        self.expires_at = Some(now + ttl_ms);
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

crate::builder! {
    pub struct BatchBuilder => Batch {
        into {
            id: BatchId = "bat-test1",
            out_dir: PathBuf = "/tmp/vox-test/bat-test1",
        }
        set {
            state: BatchState = BatchState::Queued,
            phase: BatchPhase = BatchPhase::Validate,
            created_at: u64 = 1_000_000,
            options: BatchOptions = BatchOptions {
                policy: BatchPolicy::StageFirst,
                tasks: BatchTasks { asr: true, demucs: true },
                vad: VadTuning::default(),
            },
            items: Vec<BatchItem> = Vec::new(),
            cancel_requested: bool = false,
        }
        option {
            started_at: u64 = None,
            finished_at: u64 = None,
            expires_at: u64 = None,
            error: JobError = None,
        }
    }
}

crate::builder! {
    pub struct BatchItemBuilder => BatchItem {
        set {
            idx: usize = 0,
            input: InputDescriptor = InputDescriptor::AudioPath { path: "/tmp/in.wav".into() },
            source: InputSource = InputSource::AudioPath,
            owned_input: bool = false,
            state: ItemState = ItemState::Queued,
            phase: JobPhase = JobPhase::Queued,
            artifacts: ArtifactMap = ArtifactMap::new(),
        }
        option {
            audio_path: PathBuf = None,
            started_at: u64 = None,
            finished_at: u64 = None,
            error: JobError = None,
        }
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
