// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch scheduler specs.

use super::prelude::*;

/// Three items via upload, URL, and local path; both stages. All SRTs are
/// downloadable before any item enters separation (stage-first), and the
/// batch ends `succeeded` with `counts.total = succeeded = 3`.
#[tokio::test]
async fn mixed_input_batch_runs_both_stages() {
    let tmp = tempfile::tempdir().unwrap();
    let service = boot(tmp.path()).await;

    let spool = tmp.path().join("state/uploads/upload-batch-0");
    tokio::fs::write(&spool, b"uploaded-bytes").await.unwrap();
    let url = serve_once(b"remote-bytes".to_vec()).await;
    let local = tmp.path().join("local.wav");
    tokio::fs::write(&local, b"local-bytes").await.unwrap();

    let created = service
        .create_batch(batch_request(
            BatchTasks { asr: true, demucs: true },
            vec![
                InputDescriptor::Upload { spool_path: spool, file_name: "first.wav".into() },
                InputDescriptor::AudioUrl { url },
                InputDescriptor::AudioPath { path: local.clone() },
            ],
        ))
        .await
        .unwrap();
    assert!(created.batch_id.starts_with("bat-"));
    assert_eq!(created.status_url, format!("/v2/batches/{}", created.batch_id));

    let dto = wait_terminal_batch(&service, &created.batch_id).await;
    assert_eq!(dto.state, "succeeded");
    assert_eq!(dto.counts.total, 3);
    assert_eq!(dto.counts.succeeded, 3);

    for item in &dto.items {
        for name in ["srt", "vocals", "no_vocals", "demucs_zip", "result_zip"] {
            assert!(item.artifacts[name].ready, "item {} {name} not ready", item.idx);
        }
        assert_eq!(item.state, "succeeded");
        assert_eq!(item.phase, "done");
    }

    // Unowned input survives; owned ones are gone.
    assert!(local.exists());
    let srt = service.batch_item_artifact(&created.batch_id, 1, "output.srt").unwrap();
    assert!(srt.is_file());
}

/// Item 0 is a zero-byte file: it fails `bad_audio`, the other items
/// proceed, and the batch terminates `failed` with counts 1/2.
#[tokio::test]
async fn zero_byte_item_fails_alone() {
    let tmp = tempfile::tempdir().unwrap();
    let service = boot(tmp.path()).await;

    let empty = tmp.path().join("empty.wav");
    tokio::fs::write(&empty, b"").await.unwrap();
    let ok_a = tmp.path().join("ok-a.wav");
    tokio::fs::write(&ok_a, b"bytes").await.unwrap();
    let ok_b = tmp.path().join("ok-b.wav");
    tokio::fs::write(&ok_b, b"bytes").await.unwrap();

    let created = service
        .create_batch(batch_request(
            BatchTasks { asr: true, demucs: false },
            vec![
                InputDescriptor::AudioPath { path: empty },
                InputDescriptor::AudioPath { path: ok_a },
                InputDescriptor::AudioPath { path: ok_b },
            ],
        ))
        .await
        .unwrap();

    let dto = wait_terminal_batch(&service, &created.batch_id).await;
    assert_eq!(dto.state, "failed");
    assert_eq!(dto.counts.failed, 1);
    assert_eq!(dto.counts.succeeded, 2);

    assert_eq!(dto.items[0].state, "failed");
    assert_eq!(dto.items[0].error.as_ref().map(|e| e.code), Some(ErrorCode::BadAudio));
    assert!(dto.items[1].artifacts["srt"].ready);
    assert!(dto.items[2].artifacts["srt"].ready);
}

/// Oversize URL input: creation itself is rejected `bad_request` and no
/// batch record is left behind.
#[tokio::test]
async fn oversize_url_input_rejects_the_creation() {
    let tmp = tempfile::tempdir().unwrap();
    let service = {
        let mut config = config(tmp.path());
        config.max_download_bytes = 64;
        use vox_adapters::{Separator, Transcoder};
        use vox_engine::Engines;
        let engines = Engines {
            transcoder: Transcoder::new(stub_tool(tmp.path(), "t", TRANSCODER)),
            separator: Separator::new(stub_tool(tmp.path(), "s", "exit 0"), 256, 2),
            recognizer: Arc::new(StubRecognizer),
        };
        MediaService::with_engines(config, FakeClock::new(), Arc::new(engines)).await.unwrap()
    };

    let url = serve_once(vec![0u8; 4096]).await;
    let err = service
        .create_batch(batch_request(
            BatchTasks { asr: true, demucs: false },
            vec![InputDescriptor::AudioUrl { url }],
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::BadRequest);

    // The half-created directory was cleaned up.
    let batches_dir = tmp.path().join("state/batches");
    let left: Vec<_> = std::fs::read_dir(&batches_dir).unwrap().collect();
    assert!(left.is_empty(), "batch dir not cleaned up: {left:?}");
}
