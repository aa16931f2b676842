// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;
use vox_adapters::{Recognition, Recognizer};
use vox_core::{ErrorCode, FakeClock};

fn stub_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

struct InstantRecognizer;

#[async_trait]
impl Recognizer for InstantRecognizer {
    async fn recognize(
        &self,
        _audio_path: &Path,
        out_dir: &Path,
        _vad: vox_core::VadTuning,
    ) -> Result<Recognition, JobError> {
        let srt_path = out_dir.join("recognizer-out.srt");
        tokio::fs::write(&srt_path, "1\n00:00:00,000 --> 00:00:01,000\nhi\n\n")
            .await
            .map_err(JobError::from)?;
        Ok(Recognition { srt_path })
    }
}

async fn test_service(root: &Path) -> MediaService<FakeClock> {
    let transcoder = Transcoder::new(stub_tool(
        root,
        "stub-transcoder",
        r#"in=""
for a in "$@"; do last="$a"; done
while [ $# -gt 0 ]; do if [ "$1" = "-i" ]; then in="$2"; fi; shift; done
cp "$in" "$last""#,
    ));
    let separator = Separator::new(
        stub_tool(
            root,
            "stub-separator",
            r#"out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  prev="$a"
done
mkdir -p "$out/htdemucs/track"
echo v > "$out/htdemucs/track/vocals.mp3"
echo n > "$out/htdemucs/track/no_vocals.mp3""#,
        ),
        256,
        2,
    );
    let config = Config {
        tmp_dir: root.join("state"),
        job_ttl_seconds: 21_600,
        demucs_mp3_bitrate: 256,
        demucs_jobs: 2,
        ffmpeg_bin: "unused".into(),
        demucs_bin: "unused".into(),
        asr_worker_cmd: vec!["unused".to_string()],
        asr_idle_seconds: 600,
        max_download_bytes: 0,
    };
    let engines =
        Engines { transcoder, separator, recognizer: Arc::new(InstantRecognizer) };
    MediaService::with_engines(config, FakeClock::new(), Arc::new(engines)).await.unwrap()
}

async fn audio_file(root: &Path, name: &str) -> InputDescriptor {
    let path = root.join(name);
    tokio::fs::write(&path, b"riff-data").await.unwrap();
    InputDescriptor::AudioPath { path }
}

fn job_request(job_type: &str, input: InputDescriptor) -> NewJobRequest {
    NewJobRequest {
        job_type: job_type.to_string(),
        input,
        vad_max_single_segment_ms: None,
        vad_max_end_silence_ms: None,
    }
}

async fn wait_terminal_job(service: &MediaService<FakeClock>, id: &str) -> JobDto {
    for _ in 0..200 {
        let dto = service.job_status(id).unwrap();
        if dto.state == "succeeded" || dto.state == "failed" {
            return dto;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} did not reach a terminal state");
}

async fn wait_terminal_batch(service: &MediaService<FakeClock>, id: &str) -> BatchDto {
    for _ in 0..200 {
        let dto = service.batch_status(id).unwrap();
        if dto.state != "queued" && dto.state != "running" {
            return dto;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("batch {id} did not reach a terminal state");
}

#[tokio::test]
async fn unknown_job_type_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let service = test_service(tmp.path()).await;
    let input = audio_file(tmp.path(), "a.wav").await;
    let err = service.create_job(job_request("karaoke", input)).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BadRequest);
}

#[tokio::test]
async fn combined_aliases_map_to_asr_demucs() {
    let tmp = tempfile::tempdir().unwrap();
    let service = test_service(tmp.path()).await;
    for alias in ["demucs-asr", "demucsasr", "asr+demucs", ""] {
        let input = audio_file(tmp.path(), &format!("{}.wav", alias.len())).await;
        let created = service.create_job(job_request(alias, input)).await.unwrap();
        let dto = service.job_status(&created.job_id).unwrap();
        assert_eq!(dto.job_type, "asr-demucs", "alias {alias:?}");
    }
}

#[tokio::test]
async fn non_positive_vad_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let service = test_service(tmp.path()).await;
    let input = audio_file(tmp.path(), "a.wav").await;
    let mut request = job_request("asr", input);
    request.vad_max_single_segment_ms = Some(0);
    let err = service.create_job(request).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BadRequest);
}

#[tokio::test]
async fn creation_returns_202_body_and_queued_state() {
    let tmp = tempfile::tempdir().unwrap();
    let service = test_service(tmp.path()).await;
    let input = audio_file(tmp.path(), "a.wav").await;
    let created = service.create_job(job_request("asr", input)).await.unwrap();
    assert!(created.job_id.starts_with("job-"));
    assert_eq!(created.status_url, format!("/v2/jobs/{}", created.job_id));
    // Status is readable immediately, before the queue picks the job up.
    let dto = service.job_status(&created.job_id).unwrap();
    assert!(dto.state == "queued" || dto.state == "running" || dto.state == "succeeded");
}

#[tokio::test]
async fn asr_job_runs_to_success_with_downloadable_srt() {
    let tmp = tempfile::tempdir().unwrap();
    let service = test_service(tmp.path()).await;
    let input = audio_file(tmp.path(), "a.wav").await;
    let created = service.create_job(job_request("asr", input)).await.unwrap();

    let dto = wait_terminal_job(&service, &created.job_id).await;
    assert_eq!(dto.state, "succeeded");
    assert_eq!(dto.phase, "done");
    let srt = &dto.artifacts["srt"];
    assert!(srt.ready);
    assert_eq!(
        srt.url.as_deref(),
        Some(format!("/v2/jobs/{}/artifacts/output.srt", created.job_id).as_str())
    );

    let path = service.job_artifact(&created.job_id, "output.srt").unwrap();
    let body = tokio::fs::read_to_string(&path).await.unwrap();
    assert!(body.starts_with("1\n"));
}

#[tokio::test]
async fn missing_artifact_download_message_is_stable() {
    let tmp = tempfile::tempdir().unwrap();
    let service = test_service(tmp.path()).await;
    let input = audio_file(tmp.path(), "a.wav").await;
    let created = service.create_job(job_request("asr", input)).await.unwrap();
    wait_terminal_job(&service, &created.job_id).await;

    let err = service.job_artifact(&created.job_id, "vocals.mp3").unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(err.message, "Artifact not found (or not ready yet)");
}

#[tokio::test]
async fn unknown_ids_surface_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let service = test_service(tmp.path()).await;
    assert_eq!(service.job_status("job-missing").unwrap_err().code, ErrorCode::NotFound);
    assert_eq!(service.batch_status("bat-missing").unwrap_err().code, ErrorCode::NotFound);
    assert_eq!(service.cancel_batch("bat-missing").unwrap_err().code, ErrorCode::NotFound);
}

#[tokio::test]
async fn batch_size_bounds_are_enforced() {
    let tmp = tempfile::tempdir().unwrap();
    let service = test_service(tmp.path()).await;

    let err = service
        .create_batch(NewBatchRequest {
            tasks: BatchTasks { asr: true, demucs: false },
            inputs: Vec::new(),
            vad_max_single_segment_ms: None,
            vad_max_end_silence_ms: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::BadRequest);

    let mut inputs = Vec::new();
    for i in 0..11 {
        inputs.push(audio_file(tmp.path(), &format!("b{i}.wav")).await);
    }
    let err = service
        .create_batch(NewBatchRequest {
            tasks: BatchTasks { asr: true, demucs: false },
            inputs,
            vad_max_single_segment_ms: None,
            vad_max_end_silence_ms: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::BadRequest);
}

#[tokio::test]
async fn batch_runs_to_success_and_cancel_after_is_a_no_op() {
    let tmp = tempfile::tempdir().unwrap();
    let service = test_service(tmp.path()).await;
    let mut inputs = Vec::new();
    for i in 0..2 {
        inputs.push(audio_file(tmp.path(), &format!("c{i}.wav")).await);
    }
    let created = service
        .create_batch(NewBatchRequest {
            tasks: BatchTasks { asr: true, demucs: true },
            inputs,
            vad_max_single_segment_ms: None,
            vad_max_end_silence_ms: None,
        })
        .await
        .unwrap();
    assert!(created.batch_id.starts_with("bat-"));

    let dto = wait_terminal_batch(&service, &created.batch_id).await;
    assert_eq!(dto.state, "succeeded");
    assert_eq!(dto.counts.succeeded, 2);
    for item in &dto.items {
        assert!(item.artifacts["srt"].ready);
        assert!(item.artifacts["result_zip"].ready);
    }

    // Cancel on a terminal batch returns current state unchanged.
    let canceled = service.cancel_batch(&created.batch_id).unwrap();
    assert_eq!(canceled.state, "succeeded");
    assert!(!canceled.cancel_requested);

    let path = service.batch_item_artifact(&created.batch_id, 0, "output.srt").unwrap();
    assert!(path.is_file());
    let err = service.batch_item_artifact(&created.batch_id, 5, "output.srt").unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn jobs_and_batches_share_the_serial_queue() {
    let tmp = tempfile::tempdir().unwrap();
    let service = test_service(tmp.path()).await;
    let mut ids = Vec::new();
    for i in 0..3 {
        let input = audio_file(tmp.path(), &format!("q{i}.wav")).await;
        ids.push(service.create_job(job_request("asr", input)).await.unwrap().job_id);
    }
    for id in &ids {
        let dto = wait_terminal_job(&service, id).await;
        assert_eq!(dto.state, "succeeded");
    }
    let stats = service.queue_stats();
    assert_eq!((stats.pending, stats.running), (0, 0));
}
