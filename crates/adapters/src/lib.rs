// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vox-adapters: uniform invocation layer over the external engines.
//!
//! Four tools sit behind these shims: the transcoder (wav mono-16k
//! converter), the source separator, the long-lived ASR recognizer, and
//! the archive packer. Each adapter is handed an absolute directory it is
//! free to write into and never mutates files outside it; failures are
//! classified into the public error taxonomy at this boundary.

pub mod asr;
pub mod pack;
pub mod separate;
pub mod subprocess;
pub mod transcode;

pub use asr::{AsrSupervisor, AsrWorkerConfig, Recognition, Recognizer, WorkerError, WorkerInfo};
pub use pack::{pack_zip, ZipEntry};
pub use separate::{Separator, SeparatedStems};
pub use subprocess::{run_engine, EngineRun, STDERR_TAIL_LIMIT};
pub use transcode::Transcoder;
