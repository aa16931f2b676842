// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the scenario specs.

pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;
pub use std::time::Duration;
pub use vox_core::{BatchTasks, ErrorCode, FakeClock, InputDescriptor, JobError};
pub use vox_service::{BatchDto, Config, JobDto, MediaService, NewBatchRequest, NewJobRequest};

use async_trait::async_trait;
use std::os::unix::fs::PermissionsExt;
use vox_adapters::{Recognition, Recognizer, Separator, Transcoder};
use vox_engine::Engines;

/// Write an executable shell stub into `dir`.
pub fn stub_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Transcoder stub: rejects empty inputs (like a real decoder), copies
/// everything else to the output.
pub const TRANSCODER: &str = r#"in=""
for a in "$@"; do last="$a"; done
while [ $# -gt 0 ]; do if [ "$1" = "-i" ]; then in="$2"; fi; shift; done
[ -s "$in" ] || { echo "empty or unreadable input: $in" >&2; exit 1; }
cp "$in" "$last""#;

/// Separator stub producing both stems in the tool's nested layout.
/// `sleep` widens the window for progressive-visibility assertions.
pub fn separator_body(sleep_secs: &str) -> String {
    format!(
        r#"out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  prev="$a"
done
sleep {sleep_secs}
mkdir -p "$out/htdemucs/track"
echo vocal-bytes > "$out/htdemucs/track/vocals.mp3"
echo instrumental-bytes > "$out/htdemucs/track/no_vocals.mp3""#
    )
}

/// Recognizer double writing a well-formed two-entry SRT.
pub struct StubRecognizer;

#[async_trait]
impl Recognizer for StubRecognizer {
    async fn recognize(
        &self,
        _audio_path: &Path,
        out_dir: &Path,
        _vad: vox_core::VadTuning,
    ) -> Result<Recognition, JobError> {
        let srt_path = out_dir.join("recognizer-out.srt");
        let body = "1\n00:00:00,000 --> 00:00:04,200\nhello from the spec suite\n\n\
                    2\n00:00:04,200 --> 00:00:09,900\nsecond caption\n\n";
        tokio::fs::write(&srt_path, body).await.map_err(JobError::from)?;
        Ok(Recognition { srt_path })
    }
}

/// Orchestrator wired to stub engines, state rooted at `root/state`.
pub async fn boot(root: &Path) -> MediaService<FakeClock> {
    boot_with_separator_sleep(root, "0").await
}

pub async fn boot_with_separator_sleep(root: &Path, sleep_secs: &str) -> MediaService<FakeClock> {
    let engines = Engines {
        transcoder: Transcoder::new(stub_tool(root, "spec-transcoder", TRANSCODER)),
        separator: Separator::new(
            stub_tool(root, "spec-separator", &separator_body(sleep_secs)),
            256,
            2,
        ),
        recognizer: Arc::new(StubRecognizer),
    };
    MediaService::with_engines(config(root), FakeClock::new(), Arc::new(engines)).await.unwrap()
}

pub fn config(root: &Path) -> Config {
    Config {
        tmp_dir: root.join("state"),
        job_ttl_seconds: 21_600,
        demucs_mp3_bitrate: 256,
        demucs_jobs: 2,
        ffmpeg_bin: "unused".into(),
        demucs_bin: "unused".into(),
        asr_worker_cmd: vec!["unused".to_string()],
        asr_idle_seconds: 600,
        max_download_bytes: 0,
    }
}

pub fn job_request(job_type: &str, input: InputDescriptor) -> NewJobRequest {
    NewJobRequest {
        job_type: job_type.to_string(),
        input,
        vad_max_single_segment_ms: None,
        vad_max_end_silence_ms: None,
    }
}

pub fn batch_request(tasks: BatchTasks, inputs: Vec<InputDescriptor>) -> NewBatchRequest {
    NewBatchRequest {
        tasks,
        inputs,
        vad_max_single_segment_ms: None,
        vad_max_end_silence_ms: None,
    }
}

pub async fn wait_terminal_job(service: &MediaService<FakeClock>, id: &str) -> JobDto {
    for _ in 0..500 {
        let dto = service.job_status(id).unwrap();
        if dto.state == "succeeded" || dto.state == "failed" {
            return dto;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} did not reach a terminal state");
}

pub async fn wait_terminal_batch(service: &MediaService<FakeClock>, id: &str) -> BatchDto {
    for _ in 0..500 {
        let dto = service.batch_status(id).unwrap();
        if dto.state != "queued" && dto.state != "running" {
            return dto;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("batch {id} did not reach a terminal state");
}

/// One-shot HTTP server returning `body` for any request.
pub async fn serve_once(body: Vec<u8>) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = socket.read(&mut request).await;
        let header = format!(
            "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(header.as_bytes()).await.unwrap();
        socket.write_all(&body).await.unwrap();
    });
    format!("http://{addr}/remote-track.mp3")
}

/// Entry names inside a zip, sorted.
pub fn zip_names(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut names: Vec<String> =
        (0..archive.len()).map(|i| archive.by_index(i).unwrap().name().to_string()).collect();
    names.sort();
    names
}
