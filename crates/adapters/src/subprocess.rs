// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot engine invocation with bounded stderr capture.
//!
//! Engine stderr is kept as a rolling tail so a chatty decoder cannot grow
//! error details without bound; the surfaced tail is capped at
//! [`STDERR_TAIL_LIMIT`] bytes.

use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use vox_core::JobError;

/// Maximum bytes of engine stderr surfaced in error details.
pub const STDERR_TAIL_LIMIT: usize = 32 * 1024;

/// Exit status plus the trailing stderr of a finished engine run.
#[derive(Debug)]
pub struct EngineRun {
    pub status: std::process::ExitStatus,
    pub stderr_tail: String,
}

impl EngineRun {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run an engine to completion.
///
/// stdin is closed and stdout discarded; the engines report through files
/// and exit codes, with stderr as diagnostics. Spawn failures (missing
/// binary, permissions) are `internal_error`.
pub async fn run_engine(tool: &'static str, cmd: &mut Command) -> Result<EngineRun, JobError> {
    cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::piped()).kill_on_drop(true);

    let start = std::time::Instant::now();
    let mut child = cmd
        .spawn()
        .map_err(|e| JobError::internal(format!("failed to start {tool}: {e}")))?;

    let mut stderr_tail = Vec::new();
    if let Some(mut stderr) = child.stderr.take() {
        let mut buf = [0u8; 8192];
        loop {
            match stderr.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    stderr_tail.extend_from_slice(&buf[..n]);
                    // Rolling tail: trim from the front once well past the cap.
                    if stderr_tail.len() > STDERR_TAIL_LIMIT * 2 {
                        stderr_tail.drain(..stderr_tail.len() - STDERR_TAIL_LIMIT);
                    }
                }
                Err(_) => break,
            }
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| JobError::internal(format!("failed to wait for {tool}: {e}")))?;

    let elapsed_ms = start.elapsed().as_millis() as u64;
    if status.success() {
        tracing::info!(tool, elapsed_ms, "engine finished");
    } else {
        tracing::warn!(tool, elapsed_ms, status = %status, "engine failed");
    }

    Ok(EngineRun { status, stderr_tail: tail_string(stderr_tail) })
}

/// Last ≤[`STDERR_TAIL_LIMIT`] bytes as lossy UTF-8.
fn tail_string(mut bytes: Vec<u8>) -> String {
    if bytes.len() > STDERR_TAIL_LIMIT {
        bytes.drain(..bytes.len() - STDERR_TAIL_LIMIT);
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
