// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-job pipeline specs.

use super::prelude::*;

/// Upload → asr: SRT published, well-formed, spool entry consumed.
#[tokio::test]
async fn upload_asr_job_produces_wellformed_srt() {
    let tmp = tempfile::tempdir().unwrap();
    let service = boot(tmp.path()).await;

    // The transport spools uploads before handing them over.
    let spool = tmp.path().join("state/uploads/upload-123");
    tokio::fs::write(&spool, b"ten-seconds-of-mono-wav").await.unwrap();

    let created = service
        .create_job(job_request(
            "asr",
            InputDescriptor::Upload { spool_path: spool.clone(), file_name: "clip.wav".into() },
        ))
        .await
        .unwrap();

    let dto = wait_terminal_job(&service, &created.job_id).await;
    assert_eq!(dto.state, "succeeded");
    assert_eq!(dto.phase, "done");
    assert!(!spool.exists(), "spooled upload should have been moved");

    let srt_path = service.job_artifact(&created.job_id, "output.srt").unwrap();
    let body = tokio::fs::read_to_string(&srt_path).await.unwrap();
    let mut lines = body.lines();
    assert_eq!(lines.next(), Some("1"));
    let timing = lines.next().unwrap();
    let ok = timing.len() == 29 && timing.contains(" --> ") && timing.contains(',');
    assert!(ok, "unexpected timing line: {timing:?}");
}

/// Local-path → demucs: stems + zip published, the library file untouched.
#[tokio::test]
async fn audio_path_demucs_job_preserves_the_input() {
    let tmp = tempfile::tempdir().unwrap();
    let service = boot(tmp.path()).await;

    let library_track = tmp.path().join("library-track.flac");
    tokio::fs::write(&library_track, b"flac-bytes").await.unwrap();

    let created = service
        .create_job(job_request(
            "demucs",
            InputDescriptor::AudioPath { path: library_track.clone() },
        ))
        .await
        .unwrap();

    let dto = wait_terminal_job(&service, &created.job_id).await;
    assert_eq!(dto.state, "succeeded");
    for name in ["vocals", "no_vocals", "demucs_zip"] {
        assert!(dto.artifacts[name].ready, "{name} not ready");
    }
    assert!(!dto.artifacts.contains_key("srt"));

    let zip = service.job_artifact(&created.job_id, "demucs.zip").unwrap();
    assert_eq!(zip_names(&zip), vec!["no_vocals.mp3", "vocals.mp3"]);

    assert!(library_track.exists(), "unowned input must never be deleted");
}

/// asr-demucs: the SRT is observable before the job reaches its terminal
/// state, and the final bundle holds exactly the three outputs.
#[tokio::test]
async fn combined_job_publishes_srt_before_completion() {
    let tmp = tempfile::tempdir().unwrap();
    // Slow separator keeps the job running after the SRT lands.
    let service = boot_with_separator_sleep(tmp.path(), "0.5").await;

    let input = tmp.path().join("song.wav");
    tokio::fs::write(&input, b"riff-data").await.unwrap();

    let created = service
        .create_job(job_request("asr-demucs", InputDescriptor::AudioPath { path: input }))
        .await
        .unwrap();

    let mut srt_seen_while_running = false;
    let dto = loop {
        let dto = service.job_status(&created.job_id).unwrap();
        if dto.state == "running" {
            if dto.artifacts.get("srt").map(|a| a.ready).unwrap_or(false) {
                srt_seen_while_running = true;
            }
        } else if dto.state == "succeeded" || dto.state == "failed" {
            break dto;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };

    assert!(srt_seen_while_running, "srt never observable before terminal state");
    assert_eq!(dto.state, "succeeded");

    let result_zip = service.job_artifact(&created.job_id, "result.zip").unwrap();
    assert_eq!(zip_names(&result_zip), vec!["no_vocals.mp3", "output.srt", "vocals.mp3"]);
}

/// A failing separator after a published SRT: the job fails, the SRT
/// stays downloadable.
#[tokio::test]
async fn artifacts_survive_a_later_stage_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let service = {
        use vox_adapters::{Separator, Transcoder};
        use vox_engine::Engines;
        let engines = Engines {
            transcoder: Transcoder::new(stub_tool(tmp.path(), "t", TRANSCODER)),
            separator: Separator::new(
                stub_tool(tmp.path(), "s", "echo 'separator refused' >&2; exit 2"),
                256,
                2,
            ),
            recognizer: Arc::new(StubRecognizer),
        };
        MediaService::with_engines(config(tmp.path()), FakeClock::new(), Arc::new(engines))
            .await
            .unwrap()
    };

    let input = tmp.path().join("song.wav");
    tokio::fs::write(&input, b"riff-data").await.unwrap();
    let created = service
        .create_job(job_request("asr-demucs", InputDescriptor::AudioPath { path: input }))
        .await
        .unwrap();

    let dto = wait_terminal_job(&service, &created.job_id).await;
    assert_eq!(dto.state, "failed");
    assert_eq!(dto.error.as_ref().map(|e| e.code), Some(ErrorCode::BadAudio));
    assert!(dto.artifacts["srt"].ready);
    assert!(service.job_artifact(&created.job_id, "output.srt").is_ok());
    assert_eq!(
        service.job_artifact(&created.job_id, "result.zip").unwrap_err().message,
        "Artifact not found (or not ready yet)"
    );
}
