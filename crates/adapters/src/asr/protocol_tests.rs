// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use vox_core::VadTuning;

#[test]
fn request_line_uses_wire_names() {
    let request = WorkerRequest::Asr {
        id: 7,
        audio_path: "/tmp/vox/jobs-v2/job-1/asr.wav".into(),
        out_dir: "/tmp/vox/jobs-v2/job-1".into(),
        vad: VadTuning { max_single_segment_ms: Some(20000), max_end_silence_ms: None },
    };
    let line = request.to_line().unwrap();
    assert!(line.ends_with('\n'));
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["type"], "asr");
    assert_eq!(value["id"], 7);
    assert_eq!(value["audioPath"], "/tmp/vox/jobs-v2/job-1/asr.wav");
    assert_eq!(value["outDir"], "/tmp/vox/jobs-v2/job-1");
    assert_eq!(value["vadMaxSingleSegmentMs"], 20000);
    assert!(value.get("vadMaxEndSilenceMs").is_none());
}

#[test]
fn ready_parses_with_optional_fields() {
    let event =
        parse_worker_line(r#"{"type":"ready","pid":4242,"device":"cuda","ncpu":8,"idleSeconds":600}"#)
            .unwrap();
    assert_eq!(
        event,
        WorkerEvent::Ready {
            pid: Some(4242),
            device: Some("cuda".to_string()),
            ncpu: Some(8),
            idle_seconds: Some(600),
        }
    );
}

#[test]
fn bare_ready_parses() {
    let event = parse_worker_line(r#"{"type":"ready"}"#).unwrap();
    assert!(matches!(event, WorkerEvent::Ready { pid: None, .. }));
}

#[test]
fn success_result_parses() {
    let event =
        parse_worker_line(r#"{"type":"result","id":3,"ok":true,"srtPath":"/tmp/x.srt"}"#).unwrap();
    assert_eq!(
        event,
        WorkerEvent::Result {
            id: 3,
            ok: true,
            srt_path: Some("/tmp/x.srt".into()),
            error: None,
            traceback: None,
        }
    );
}

#[test]
fn failure_result_parses_with_traceback() {
    let event = parse_worker_line(
        r#"{"type":"result","id":4,"ok":false,"error":"oom","traceback":"Traceback..."}"#,
    )
    .unwrap();
    match event {
        WorkerEvent::Result { id, ok, error, traceback, .. } => {
            assert_eq!(id, 4);
            assert!(!ok);
            assert_eq!(error.as_deref(), Some("oom"));
            assert_eq!(traceback.as_deref(), Some("Traceback..."));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[yare::parameterized(
    empty = { "" },
    blank = { "   " },
    not_json = { "loading model shards..." },
    unknown_type = { r#"{"type":"progress","pct":50}"# },
    wrong_shape = { r#"{"type":"result"}"# },
)]
fn junk_lines_yield_none(line: &str) {
    assert!(parse_worker_line(line).is_none());
}
