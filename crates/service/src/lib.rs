// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vox-service: the facade the HTTP transport calls.
//!
//! Owns request validation, record creation (input materialization +
//! initial persist + enqueue), status snapshots as wire DTOs, batch
//! cancellation, and artifact download resolution. Routing, auth, and
//! multipart decoding stay in the transport layer.

pub mod dto;
pub mod env;
pub mod service;

pub use dto::{
    ArtifactDto, BatchCreated, BatchDto, BatchItemDto, ErrorBody, JobCreated, JobDto,
};
pub use env::Config;
pub use service::{MediaService, NewBatchRequest, NewJobRequest};

/// Initialize tracing from `RUST_LOG` (default `info`). Safe to call more
/// than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
