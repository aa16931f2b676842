// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for runner tests: stub engine binaries and a scripted
//! recognizer.

use crate::job_runner::{Engines, RunnerCtx};
use crate::registry::Registry;
use async_trait::async_trait;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vox_adapters::{Recognition, Recognizer, Separator, Transcoder};
use vox_core::{FakeClock, JobError, VadTuning};

pub const TEST_TTL_MS: u64 = 21_600_000;

/// Write an executable shell stub into `dir`.
pub fn stub_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Transcoder stub: copies the `-i` input to the final argument.
pub const COPY_TRANSCODER: &str = r#"in=""
for a in "$@"; do last="$a"; done
while [ $# -gt 0 ]; do if [ "$1" = "-i" ]; then in="$2"; fi; shift; done
cp "$in" "$last""#;

/// Separator stub: writes both stems under the `-o` directory the way the
/// real tool nests them.
pub const STEM_SEPARATOR: &str = r#"out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  prev="$a"
done
mkdir -p "$out/htdemucs/track"
echo vocal-bytes > "$out/htdemucs/track/vocals.mp3"
echo instrumental-bytes > "$out/htdemucs/track/no_vocals.mp3""#;

type CallHook = Box<dyn Fn(usize) + Send + Sync>;

/// Recognizer double. Writes its SRT at a worker-chosen name (not the
/// stable one) so relocation is exercised.
pub struct ScriptedRecognizer {
    calls: AtomicUsize,
    fail_with: Option<String>,
    on_call: Option<CallHook>,
    srt_body: String,
}

impl ScriptedRecognizer {
    pub fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_with: None,
            on_call: None,
            srt_body: "1\n00:00:00,000 --> 00:00:01,000\nhello world\n\n".to_string(),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self { fail_with: Some(message.into()), ..Self::ok() }
    }

    /// Invoke `hook` with the zero-based call index before each request.
    pub fn with_hook(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_call = Some(Box::new(hook));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn recognize(
        &self,
        _audio_path: &Path,
        out_dir: &Path,
        _vad: VadTuning,
    ) -> Result<Recognition, JobError> {
        let call = self.calls.fetch_add(1, Ordering::AcqRel);
        if let Some(hook) = &self.on_call {
            hook(call);
        }
        if let Some(message) = &self.fail_with {
            return Err(JobError::engine(message.clone()));
        }
        let srt_path = out_dir.join("recognizer-out.srt");
        tokio::fs::write(&srt_path, &self.srt_body).await.map_err(JobError::from)?;
        Ok(Recognition { srt_path })
    }
}

/// Runner context wired to stub binaries in `tool_dir`.
pub fn test_ctx(tool_dir: &Path, recognizer: Arc<dyn Recognizer>) -> RunnerCtx<FakeClock> {
    let transcoder = Transcoder::new(stub_tool(tool_dir, "stub-transcoder", COPY_TRANSCODER));
    let separator = Separator::new(stub_tool(tool_dir, "stub-separator", STEM_SEPARATOR), 256, 2);
    RunnerCtx {
        registry: Registry::new(),
        engines: Arc::new(Engines { transcoder, separator, recognizer }),
        clock: FakeClock::new(),
        ttl_ms: TEST_TTL_MS,
    }
}
