// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Input materialization (boundary glue).
//!
//! Converts a transport-supplied descriptor into a stable absolute path
//! the engines can read, plus an ownership flag. Uploads are moved into
//! the owning directory, URLs are downloaded into it, local paths are
//! referenced in place and never touched.

use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use vox_core::{InputDescriptor, InputSource, JobError};

/// Download policy for URL inputs.
#[derive(Debug, Clone, Copy)]
pub struct IntakePolicy {
    /// Maximum accepted download size in bytes; 0 means unlimited.
    pub max_download_bytes: u64,
}

/// A materialized input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedInput {
    pub path: PathBuf,
    pub source: InputSource,
    /// True when the core owns the file and deletes it at terminal
    /// transition.
    pub owned: bool,
}

/// Materialize `descriptor`; owned inputs land at `dest`.
pub async fn materialize(
    descriptor: &InputDescriptor,
    dest: &Path,
    http: &reqwest::Client,
    policy: IntakePolicy,
) -> Result<MaterializedInput, JobError> {
    match descriptor {
        InputDescriptor::Upload { spool_path, .. } => {
            move_file(spool_path, dest).await?;
            Ok(MaterializedInput {
                path: dest.to_path_buf(),
                source: InputSource::Upload,
                owned: true,
            })
        }
        InputDescriptor::AudioPath { path } => {
            match tokio::fs::metadata(path).await {
                Ok(meta) if meta.is_file() => {}
                _ => {
                    return Err(JobError::bad_request(format!(
                        "audio file not found: {}",
                        path.display()
                    )))
                }
            }
            Ok(MaterializedInput {
                path: path.clone(),
                source: InputSource::AudioPath,
                owned: false,
            })
        }
        InputDescriptor::AudioUrl { url } => {
            download_to(http, url, dest, policy).await?;
            Ok(MaterializedInput {
                path: dest.to_path_buf(),
                source: InputSource::AudioUrl,
                owned: true,
            })
        }
    }
}

/// Move a file by rename, falling back to copy+delete when the spool and
/// the destination live on different filesystems.
pub async fn move_file(src: &Path, dest: &Path) -> Result<(), JobError> {
    if tokio::fs::rename(src, dest).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(src, dest)
        .await
        .map_err(|e| JobError::internal(format!("failed to move {}: {e}", src.display())))?;
    if let Err(e) = tokio::fs::remove_file(src).await {
        tracing::warn!(path = %src.display(), error = %e, "failed to remove moved source");
    }
    Ok(())
}

/// Stream a remote file to disk, enforcing the size policy.
async fn download_to(
    http: &reqwest::Client,
    url: &str,
    dest: &Path,
    policy: IntakePolicy,
) -> Result<(), JobError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| JobError::bad_request(format!("failed to download audio: {e}")))?;
    if !response.status().is_success() {
        return Err(JobError::bad_request(format!(
            "failed to download audio: HTTP {} from {url}",
            response.status()
        )));
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| JobError::internal(format!("failed to create {}: {e}", dest.display())))?;
    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                abandon(dest).await;
                return Err(JobError::bad_request(format!("download interrupted: {e}")));
            }
        };
        downloaded += chunk.len() as u64;
        if policy.max_download_bytes > 0 && downloaded > policy.max_download_bytes {
            abandon(dest).await;
            return Err(JobError::bad_request(format!(
                "download exceeds {} bytes",
                policy.max_download_bytes
            )));
        }
        if let Err(e) = file.write_all(&chunk).await {
            abandon(dest).await;
            return Err(JobError::internal(format!("failed to write download: {e}")));
        }
    }
    file.flush()
        .await
        .map_err(|e| JobError::internal(format!("failed to flush download: {e}")))?;
    tracing::info!(url, bytes = downloaded, "audio downloaded");
    Ok(())
}

async fn abandon(dest: &Path) {
    let _ = tokio::fs::remove_file(dest).await;
}

#[cfg(test)]
#[path = "intake_tests.rs"]
mod tests;
