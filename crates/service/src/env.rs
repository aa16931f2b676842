// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the service.

use std::path::PathBuf;
use std::str::FromStr;

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of `uploads/`, `out/`, `jobs-v2/`, `batches/`.
    pub tmp_dir: PathBuf,
    /// TTL for terminal records, in seconds.
    pub job_ttl_seconds: u64,
    pub demucs_mp3_bitrate: u32,
    pub demucs_jobs: u32,
    pub ffmpeg_bin: PathBuf,
    pub demucs_bin: PathBuf,
    /// Recognizer command line, split on whitespace.
    pub asr_worker_cmd: Vec<String>,
    /// Idle shutdown told to the recognizer on spawn, in seconds.
    pub asr_idle_seconds: u64,
    /// URL input size cap in bytes; 0 means unlimited.
    pub max_download_bytes: u64,
}

impl Config {
    /// Resolve from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            tmp_dir: PathBuf::from(env_or("TMP_DIR", "/tmp/vox")),
            job_ttl_seconds: env_parse("JOB_TTL_SECONDS", 21_600),
            demucs_mp3_bitrate: env_parse("DEMUCS_MP3_BITRATE", 256),
            demucs_jobs: env_parse("DEMUCS_JOBS", 2),
            ffmpeg_bin: PathBuf::from(env_or("FFMPEG_BIN", "ffmpeg")),
            demucs_bin: PathBuf::from(env_or("DEMUCS_BIN", "demucs")),
            asr_worker_cmd: env_or("ASR_WORKER_CMD", "asr-worker")
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            asr_idle_seconds: env_parse("ASR_IDLE_SECONDS", 600),
            max_download_bytes: env_parse("MAX_DOWNLOAD_BYTES", 0),
        }
    }

    pub fn ttl_ms(&self) -> u64 {
        self.job_ttl_seconds * 1_000
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).ok().filter(|s| !s.is_empty()).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr + Copy>(name: &str, default: T) -> T {
    std::env::var(name).ok().and_then(|s| s.parse::<T>().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
