// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Long-lived ASR recognizer: wire protocol and process supervisor.
//!
//! The recognizer preloads heavy models, so it runs as a single long-lived
//! subprocess multiplexed across requests via line-delimited JSON on its
//! standard streams. The supervisor owns lazy spawn, the readiness
//! handshake, request/response correlation, idle-exit tolerance, and a
//! one-shot respawn-and-retry when the worker dies mid-request.

mod protocol;
mod supervisor;

pub use protocol::{parse_worker_line, WorkerEvent, WorkerRequest};
pub use supervisor::{AsrSupervisor, AsrWorkerConfig, Recognition, WorkerError, WorkerInfo};

use async_trait::async_trait;
use std::path::Path;
use vox_core::{JobError, VadTuning};

/// Seam for the recognize operation, so pipeline code can run against a
/// scripted recognizer in tests.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Transcribe `audio_path`, writing outputs under `out_dir`. Returns
    /// the path of the produced SRT (the worker chooses the exact
    /// location; callers relocate it).
    async fn recognize(
        &self,
        audio_path: &Path,
        out_dir: &Path,
        vad: VadTuning,
    ) -> Result<Recognition, JobError>;
}

#[async_trait]
impl Recognizer for AsrSupervisor {
    async fn recognize(
        &self,
        audio_path: &Path,
        out_dir: &Path,
        vad: VadTuning,
    ) -> Result<Recognition, JobError> {
        self.request(audio_path, out_dir, vad).await.map_err(|e| e.to_job_error())
    }
}
