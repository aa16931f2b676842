// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor for the long-lived recognizer subprocess.
//!
//! State machine: `down → starting → ready → dying → down`. Spawn is lazy
//! (first request pays the model load), `ready` on stdout is the sole
//! readiness signal, and requests are correlated to responses by a
//! monotonically increasing id. An idle-timeout exit with no requests in
//! flight is benign; the next request re-spawns. A request that observes
//! worker death is retried once against a fresh worker.

use super::protocol::{parse_worker_line, WorkerEvent, WorkerRequest};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::oneshot;
use vox_core::{JobError, VadTuning};

/// Worker stderr lines are truncated to this many bytes when surfaced.
const STDERR_LINE_LIMIT: usize = 2048;

/// How the recognizer subprocess is launched.
#[derive(Debug, Clone)]
pub struct AsrWorkerConfig {
    /// argv: binary plus fixed arguments.
    pub command: Vec<String>,
    /// Idle shutdown the worker is told on spawn (seconds). The worker is
    /// expected to exit after this much idleness; the supervisor treats
    /// such an exit as benign.
    pub idle_seconds: u64,
}

/// Failure modes of a recognize request.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("recognizer reported: {message}")]
    Reported { message: String, traceback: Option<String> },
    #[error("recognizer exited before responding")]
    Died,
    #[error("recognizer failed to start: {0}")]
    Spawn(String),
    #[error("recognizer protocol error: {0}")]
    Protocol(String),
}

impl WorkerError {
    fn is_crash(&self) -> bool {
        matches!(self, WorkerError::Died)
    }

    /// Map onto the public taxonomy: everything the worker itself says or
    /// does is `engine_error`; failing to even start it is ours.
    pub fn to_job_error(&self) -> JobError {
        match self {
            WorkerError::Reported { message, traceback } => {
                let err = JobError::engine(message.clone());
                match traceback {
                    Some(tb) => err.with_details(tb.clone()),
                    None => err,
                }
            }
            WorkerError::Died => JobError::engine(self.to_string()),
            WorkerError::Spawn(_) => JobError::internal(self.to_string()),
            WorkerError::Protocol(_) => JobError::engine(self.to_string()),
        }
    }
}

/// Result of a successful recognize request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognition {
    /// Where the worker wrote the SRT; callers relocate it into the
    /// owning directory.
    pub srt_path: PathBuf,
}

/// Metadata from the worker's `ready` message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerInfo {
    pub pid: Option<u32>,
    pub device: Option<String>,
    pub ncpu: Option<u32>,
    pub idle_seconds: Option<u64>,
}

enum Reply {
    Ok { srt_path: PathBuf },
    Failed { error: String, traceback: Option<String> },
}

/// In-flight request table, closed exactly once when the worker's stdout
/// reaches EOF. An insert either lands before the close (and is drained,
/// failing the request) or observes `closed` and reports death directly.
struct PendingState {
    closed: bool,
    map: HashMap<u64, oneshot::Sender<Reply>>,
}

type Pending = Arc<Mutex<PendingState>>;

struct Worker {
    stdin: ChildStdin,
    pending: Pending,
    alive: Arc<AtomicBool>,
    info: WorkerInfo,
}

/// Singleton owner of the recognizer subprocess.
pub struct AsrSupervisor {
    config: AsrWorkerConfig,
    slot: tokio::sync::Mutex<Option<Worker>>,
    next_id: AtomicU64,
}

impl AsrSupervisor {
    pub fn new(config: AsrWorkerConfig) -> Self {
        Self { config, slot: tokio::sync::Mutex::new(None), next_id: AtomicU64::new(1) }
    }

    /// Ready-message metadata of the live worker, if one is up.
    pub async fn info(&self) -> Option<WorkerInfo> {
        let slot = self.slot.lock().await;
        slot.as_ref().filter(|w| w.alive.load(Ordering::Acquire)).map(|w| w.info.clone())
    }

    /// Run one recognize request, respawning and retrying once if the
    /// worker dies underneath it. A second failure is surfaced.
    pub async fn request(
        &self,
        audio_path: &Path,
        out_dir: &Path,
        vad: VadTuning,
    ) -> Result<Recognition, WorkerError> {
        match self.request_once(audio_path, out_dir, vad).await {
            Err(e) if e.is_crash() => {
                tracing::warn!("recognizer died mid-request, respawning for one retry");
                self.request_once(audio_path, out_dir, vad).await
            }
            other => other,
        }
    }

    async fn request_once(
        &self,
        audio_path: &Path,
        out_dir: &Path,
        vad: VadTuning,
    ) -> Result<Recognition, WorkerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        {
            let mut slot = self.slot.lock().await;
            // A dead worker with no pending requests idled out; reap
            // silently and respawn on demand.
            if slot.as_ref().is_some_and(|w| !w.alive.load(Ordering::Acquire)) {
                *slot = None;
            }
            if slot.is_none() {
                *slot = Some(self.spawn_worker().await?);
            }
            let Some(worker) = slot.as_mut() else {
                return Err(WorkerError::Died);
            };
            let pending = worker.pending.clone();

            let closed = {
                let mut pending = pending.lock();
                if pending.closed {
                    true
                } else {
                    pending.map.insert(id, tx);
                    false
                }
            };
            if closed {
                *slot = None;
                return Err(WorkerError::Died);
            }

            let request = WorkerRequest::Asr {
                id,
                audio_path: audio_path.to_path_buf(),
                out_dir: out_dir.to_path_buf(),
                vad,
            };
            let line = request.to_line().map_err(|e| WorkerError::Protocol(e.to_string()))?;
            if let Err(e) = worker.stdin.write_all(line.as_bytes()).await {
                pending.lock().map.remove(&id);
                *slot = None;
                tracing::warn!(error = %e, "failed to write to recognizer stdin");
                return Err(WorkerError::Died);
            }
        }

        match rx.await {
            Ok(Reply::Ok { srt_path }) => Ok(Recognition { srt_path }),
            Ok(Reply::Failed { error, traceback }) => {
                Err(WorkerError::Reported { message: error, traceback })
            }
            Err(_) => Err(WorkerError::Died),
        }
    }

    /// `down → starting → ready`. Resolves once the worker's `ready` line
    /// arrives; an exit before that fails the spawn.
    async fn spawn_worker(&self) -> Result<Worker, WorkerError> {
        let Some((bin, args)) = self.config.command.split_first() else {
            return Err(WorkerError::Spawn("empty recognizer command".to_string()));
        };
        let mut cmd = Command::new(bin);
        cmd.args(args)
            .env("ASR_IDLE_SECONDS", self.config.idle_seconds.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::info!(command = %self.config.command.join(" "), "spawning recognizer");
        let start = std::time::Instant::now();
        let mut child = cmd.spawn().map_err(|e| WorkerError::Spawn(e.to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| WorkerError::Spawn("recognizer stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerError::Spawn("recognizer stdout unavailable".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        let pending: Pending =
            Arc::new(Mutex::new(PendingState { closed: false, map: HashMap::new() }));
        let alive = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = oneshot::channel();
        tokio::spawn(read_worker(child, stdout, pending.clone(), alive.clone(), ready_tx));

        match ready_rx.await {
            Ok(info) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                tracing::info!(pid = ?info.pid, device = ?info.device, elapsed_ms, "recognizer ready");
                Ok(Worker { stdin, pending, alive, info })
            }
            // Exited before the ready handshake.
            Err(_) => Err(WorkerError::Died),
        }
    }
}

/// Read the worker's stdout until EOF, routing responses by id.
async fn read_worker(
    mut child: Child,
    stdout: ChildStdout,
    pending: Pending,
    alive: Arc<AtomicBool>,
    ready_tx: oneshot::Sender<WorkerInfo>,
) {
    let mut ready_tx = Some(ready_tx);
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match parse_worker_line(&line) {
            Some(WorkerEvent::Ready { pid, device, ncpu, idle_seconds }) => {
                if let Some(tx) = ready_tx.take() {
                    let _ = tx.send(WorkerInfo { pid, device, ncpu, idle_seconds });
                }
            }
            Some(WorkerEvent::Result { id, ok, srt_path, error, traceback }) => {
                let sender = pending.lock().map.remove(&id);
                let Some(tx) = sender else {
                    tracing::warn!(id, "orphan recognizer response discarded");
                    continue;
                };
                let reply = match (ok, srt_path) {
                    (true, Some(srt_path)) => Reply::Ok { srt_path },
                    (true, None) => Reply::Failed {
                        error: "recognizer result missing srtPath".to_string(),
                        traceback: None,
                    },
                    (false, _) => Reply::Failed {
                        error: error.unwrap_or_else(|| "unspecified recognizer error".to_string()),
                        traceback,
                    },
                };
                let _ = tx.send(reply);
            }
            None => {
                tracing::warn!(line = truncate_line(&line), "unparseable recognizer output");
            }
        }
    }

    // `ready → dying → down`: close the table first so late inserts see
    // it, then drop the drained senders to fail their requests.
    alive.store(false, Ordering::Release);
    let drained: Vec<_> = {
        let mut pending = pending.lock();
        pending.closed = true;
        pending.map.drain().collect()
    };
    let status = child.wait().await.ok();
    if drained.is_empty() {
        tracing::info!(status = ?status, "recognizer exited with nothing in flight");
    } else {
        tracing::warn!(
            status = ?status,
            failed_requests = drained.len(),
            "recognizer exited with requests in flight"
        );
    }
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(target: "asr_worker", "{}", truncate_line(&line));
    }
}

fn truncate_line(line: &str) -> &str {
    if line.len() <= STDERR_LINE_LIMIT {
        return line;
    }
    let mut end = STDERR_LINE_LIMIT;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
