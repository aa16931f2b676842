// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named output artifacts.
//!
//! Each pipeline stage publishes its output under a well-known key with a
//! stable file name inside the owning job/batch-item directory. The `ready`
//! flag is authoritative only after reconciliation against the filesystem
//! (see vox-store).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Keys under which pipeline outputs are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKey {
    Srt,
    Vocals,
    NoVocals,
    DemucsZip,
    ResultZip,
}

crate::simple_display! {
    ArtifactKey {
        Srt => "srt",
        Vocals => "vocals",
        NoVocals => "no_vocals",
        DemucsZip => "demucs_zip",
        ResultZip => "result_zip",
    }
}

impl ArtifactKey {
    /// Stable file name for this artifact inside the owning directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKey::Srt => "output.srt",
            ArtifactKey::Vocals => "vocals.mp3",
            ArtifactKey::NoVocals => "no_vocals.mp3",
            ArtifactKey::DemucsZip => "demucs.zip",
            ArtifactKey::ResultZip => "result.zip",
        }
    }
}

/// Record of one published (or expected) output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Client-facing file name (`output.srt`, `vocals.mp3`, ...).
    pub name: String,
    /// Path on disk. Persisted relative to the owning directory when
    /// possible; always resolved to an absolute path at load.
    pub path: PathBuf,
    pub ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
}

impl Artifact {
    /// A ready artifact at `path` with a known size.
    pub fn ready(key: ArtifactKey, path: impl Into<PathBuf>, bytes: u64) -> Self {
        Self { name: key.file_name().to_string(), path: path.into(), ready: true, bytes: Some(bytes) }
    }
}

/// Artifact map with stable (insertion) key order, so persisted metadata
/// diffs cleanly across rewrites.
pub type ArtifactMap = IndexMap<ArtifactKey, Artifact>;

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
