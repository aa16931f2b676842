// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Packer shim: deflated zip archives with explicit entry names.
//!
//! Runs in-process (the entry-renaming contract rules out a plain zip
//! binary) on the blocking pool; failures are classified as the packer's
//! io-error class, `internal_error`.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use vox_core::JobError;
use zip::write::SimpleFileOptions;

/// One file to pack, at a stated archive name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    pub source_path: PathBuf,
    pub archive_name: String,
}

impl ZipEntry {
    pub fn new(source_path: impl Into<PathBuf>, archive_name: impl Into<String>) -> Self {
        Self { source_path: source_path.into(), archive_name: archive_name.into() }
    }
}

/// Create a deflated archive at `zip_path` containing exactly `entries`.
pub async fn pack_zip(zip_path: &Path, entries: Vec<ZipEntry>) -> Result<(), JobError> {
    let zip_path = zip_path.to_path_buf();
    let count = entries.len();
    let start = std::time::Instant::now();

    tokio::task::spawn_blocking(move || write_archive(&zip_path, &entries))
        .await
        .map_err(|e| JobError::internal(format!("pack task failed: {e}")))??;

    tracing::info!(entries = count, elapsed_ms = start.elapsed().as_millis() as u64, "archive packed");
    Ok(())
}

fn write_archive(zip_path: &Path, entries: &[ZipEntry]) -> Result<(), JobError> {
    let file = std::fs::File::create(zip_path)
        .map_err(|e| JobError::internal(format!("failed to create {}: {e}", zip_path.display())))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut buf = [0u8; 64 * 1024];
    for entry in entries {
        zip.start_file(entry.archive_name.as_str(), options)
            .map_err(|e| JobError::internal(format!("zip entry {}: {e}", entry.archive_name)))?;
        let mut src = std::fs::File::open(&entry.source_path).map_err(|e| {
            JobError::internal(format!("failed to open {}: {e}", entry.source_path.display()))
        })?;
        loop {
            let n = src.read(&mut buf).map_err(|e| {
                JobError::internal(format!("failed to read {}: {e}", entry.source_path.display()))
            })?;
            if n == 0 {
                break;
            }
            zip.write_all(&buf[..n])
                .map_err(|e| JobError::internal(format!("failed to write archive: {e}")))?;
        }
    }
    zip.finish().map_err(|e| JobError::internal(format!("failed to finish archive: {e}")))?;
    Ok(())
}

#[cfg(test)]
#[path = "pack_tests.rs"]
mod tests;
