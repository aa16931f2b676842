// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Public error taxonomy.
//!
//! Every terminal failure recorded on a job or batch item carries a
//! [`JobError`] with one of these codes; the HTTP layer maps the code to a
//! status line via [`ErrorCode::http_status`].

use serde::{Deserialize, Serialize};

/// Classification of a failure, as surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed input: unknown job type, invalid VAD params, items out of
    /// range, missing audio.
    BadRequest,
    /// The transcoder or separator refused to process the audio.
    BadAudio,
    Unauthorized,
    Forbidden,
    NotFound,
    /// The recognizer reported a failure, or a required engine output is missing.
    EngineError,
    /// Anything else: filesystem, serialization, unhandled.
    InternalError,
}

crate::simple_display! {
    ErrorCode {
        BadRequest => "bad_request",
        BadAudio => "bad_audio",
        Unauthorized => "unauthorized",
        Forbidden => "forbidden",
        NotFound => "not_found",
        EngineError => "engine_error",
        InternalError => "internal_error",
    }
}

impl ErrorCode {
    /// Standard HTTP status mapping.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::BadRequest => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::Forbidden => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::BadAudio => 422,
            ErrorCode::EngineError => 502,
            ErrorCode::InternalError => 500,
        }
    }
}

/// Error record attached to a failed job or batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct JobError {
    pub code: ErrorCode,
    pub message: String,
    /// Extra diagnostic text (e.g. a truncated engine stderr tail).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl JobError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), details: None }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn bad_audio(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadAudio, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::EngineError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Attach diagnostic details, dropping empty strings.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        self.details = if details.is_empty() { None } else { Some(details) };
        self
    }
}

impl From<std::io::Error> for JobError {
    fn from(e: std::io::Error) -> Self {
        Self::internal(format!("io error: {e}"))
    }
}

impl From<serde_json::Error> for JobError {
    fn from(e: serde_json::Error) -> Self {
        Self::internal(format!("serialization error: {e}"))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
