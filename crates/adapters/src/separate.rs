// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Separator shim: fixed two-stem (vocals / no-vocals) source separation.
//!
//! The separator decides its own directory structure under the output
//! tree (model name, track name); the stems are located afterwards by
//! file name anywhere below it.

use crate::subprocess::run_engine;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use vox_core::JobError;

/// Demucs-style separator located by a configured binary path.
#[derive(Debug, Clone)]
pub struct Separator {
    bin: PathBuf,
    mp3_bitrate: u32,
    jobs: u32,
}

/// Located stem files after a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatedStems {
    pub vocals: PathBuf,
    pub no_vocals: PathBuf,
}

impl Separator {
    pub fn new(bin: impl Into<PathBuf>, mp3_bitrate: u32, jobs: u32) -> Self {
        Self { bin: bin.into(), mp3_bitrate, jobs }
    }

    /// Split `input` into vocals/no-vocals MP3s under `out_dir`.
    ///
    /// Non-zero exit is `bad_audio` with a stderr tail; a clean exit that
    /// produced no stems is `engine_error`.
    pub async fn split(&self, input: &Path, out_dir: &Path) -> Result<SeparatedStems, JobError> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(["--two-stems", "vocals", "--mp3"])
            .arg("--mp3-bitrate")
            .arg(self.mp3_bitrate.to_string())
            .arg("-j")
            .arg(self.jobs.to_string())
            .arg("-o")
            .arg(out_dir)
            .arg(input);

        let run = run_engine("separate", &mut cmd).await?;
        if !run.success() {
            return Err(JobError::bad_audio(format!(
                "separation failed with {} for {}",
                run.status,
                input.display()
            ))
            .with_details(run.stderr_tail));
        }

        let vocals = find_by_name(out_dir, "vocals.mp3").await;
        let no_vocals = find_by_name(out_dir, "no_vocals.mp3").await;
        match (vocals, no_vocals) {
            (Some(vocals), Some(no_vocals)) => Ok(SeparatedStems { vocals, no_vocals }),
            (vocals, _) => {
                let missing = if vocals.is_none() { "vocals.mp3" } else { "no_vocals.mp3" };
                Err(JobError::engine(format!("separator produced no {missing} under {}", out_dir.display())))
            }
        }
    }
}

/// Walk the tree under `root` for an exact file name.
async fn find_by_name(root: &Path, name: &str) -> Option<PathBuf> {
    let mut queue = vec![root.to_path_buf()];
    while let Some(dir) = queue.pop() {
        let Ok(mut rd) = tokio::fs::read_dir(&dir).await else {
            continue;
        };
        while let Ok(Some(entry)) = rd.next_entry().await {
            let path = entry.path();
            match entry.file_type().await {
                Ok(t) if t.is_dir() => queue.push(path),
                Ok(t) if t.is_file() => {
                    if entry.file_name().to_str() == Some(name) {
                        return Some(path);
                    }
                }
                _ => {}
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "separate_tests.rs"]
mod tests;
