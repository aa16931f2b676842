// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types for the recognizer's line-delimited JSON protocol.
//!
//! Requests go to the worker's stdin, one JSON object per line; responses
//! come back on stdout the same way. `ready` is the sole readiness signal;
//! `result` lines are matched to requests by `id`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vox_core::VadTuning;

/// One request line on the worker's stdin.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum WorkerRequest {
    #[serde(rename = "asr", rename_all = "camelCase")]
    Asr {
        id: u64,
        audio_path: PathBuf,
        out_dir: PathBuf,
        #[serde(flatten)]
        vad: VadTuning,
    },
}

impl WorkerRequest {
    /// Serialize to a single newline-terminated line.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// One response line on the worker's stdout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerEvent {
    /// Emitted once after model load.
    #[serde(rename_all = "camelCase")]
    Ready {
        #[serde(default)]
        pid: Option<u32>,
        #[serde(default)]
        device: Option<String>,
        #[serde(default)]
        ncpu: Option<u32>,
        #[serde(default)]
        idle_seconds: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Result {
        id: u64,
        ok: bool,
        #[serde(default)]
        srt_path: Option<PathBuf>,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        traceback: Option<String>,
    },
}

/// Parse one stdout line. Unknown message types and malformed JSON yield
/// `None`; the caller logs and skips them.
pub fn parse_worker_line(line: &str) -> Option<WorkerEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    serde_json::from_str(line).ok()
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
