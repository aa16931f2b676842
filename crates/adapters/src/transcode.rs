// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transcoder shim: any decodable input → mono 16-kHz 16-bit-PCM WAV.

use crate::subprocess::run_engine;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use vox_core::JobError;

/// ffmpeg-style converter located by a configured binary path.
#[derive(Debug, Clone)]
pub struct Transcoder {
    bin: PathBuf,
}

impl Transcoder {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    /// Convert `input` into a recognizer-ready WAV at `output`.
    ///
    /// Any non-zero exit is `bad_audio` — the decoder refused the input —
    /// with a truncated stderr tail in the details.
    pub async fn to_wav_mono_16k(&self, input: &Path, output: &Path) -> Result<(), JobError> {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("-hide_banner")
            .arg("-nostdin")
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-ac", "1", "-ar", "16000", "-acodec", "pcm_s16le"])
            .arg(output);

        let run = run_engine("transcode", &mut cmd).await?;
        if !run.success() {
            return Err(JobError::bad_audio(format!(
                "transcode failed with {} for {}",
                run.status,
                input.display()
            ))
            .with_details(run.stderr_tail));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "transcode_tests.rs"]
mod tests;
