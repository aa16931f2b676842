// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Input descriptors handed over by the transport layer.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where a job's audio came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputSource {
    Upload,
    AudioPath,
    AudioUrl,
    Unknown,
}

crate::simple_display! {
    InputSource {
        Upload => "upload",
        AudioPath => "audioPath",
        AudioUrl => "audioUrl",
        Unknown => "unknown",
    }
}

/// One audio input, as described by the transport layer before the core
/// materializes it (see vox-engine's intake module).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum InputDescriptor {
    /// Multipart file already spooled to disk by the transport.
    #[serde(rename_all = "camelCase")]
    Upload { spool_path: PathBuf, file_name: String },
    /// Server-local file, referenced in place and never deleted.
    #[serde(rename_all = "camelCase")]
    AudioPath { path: PathBuf },
    /// Remote file, downloaded into the owning directory.
    #[serde(rename_all = "camelCase")]
    AudioUrl { url: String },
}

impl InputDescriptor {
    pub fn source(&self) -> InputSource {
        match self {
            InputDescriptor::Upload { .. } => InputSource::Upload,
            InputDescriptor::AudioPath { .. } => InputSource::AudioPath,
            InputDescriptor::AudioUrl { .. } => InputSource::AudioUrl,
        }
    }

    /// File extension for the materialized copy, lowercased and sanitized.
    /// Falls back to `bin` when the original name gives nothing usable.
    pub fn extension(&self) -> String {
        let raw = match self {
            InputDescriptor::Upload { file_name, .. } => ext_of(Path::new(file_name)),
            InputDescriptor::AudioPath { path } => ext_of(path),
            InputDescriptor::AudioUrl { url } => {
                // Last path segment, query string stripped.
                let tail = url.split(['?', '#']).next().unwrap_or("");
                let seg = tail.rsplit('/').next().unwrap_or("");
                ext_of(Path::new(seg))
            }
        };
        sanitize_ext(&raw)
    }
}

fn ext_of(path: &Path) -> String {
    path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase()
}

fn sanitize_ext(ext: &str) -> String {
    let clean: String =
        ext.chars().filter(|c| c.is_ascii_alphanumeric()).take(8).collect();
    if clean.is_empty() {
        "bin".to_string()
    } else {
        clean
    }
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
