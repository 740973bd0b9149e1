use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classified failure kinds handed to call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Rate or usage limit reached. Handled by the global remediation prompt.
    QuotaExceeded,
    /// Content policy rejection. Never retried.
    SafetyBlocked,
    /// Transient backend failure.
    ServerError,
    /// Anything the classifier could not place.
    Unknown,
    /// The caller aborted the call. Not produced by classification.
    Cancelled,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::QuotaExceeded | ErrorKind::ServerError)
    }

    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorKind::SafetyBlocked => "SAFETY_BLOCKED",
            ErrorKind::ServerError => "SERVER_ERROR",
            ErrorKind::Unknown => "UNKNOWN",
            ErrorKind::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Raw failure reported by a generative service adapter, before classification.
///
/// Adapters fill `status` and `code` whenever the transport or the API body
/// provides them. `message` is always present.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceFailure {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl ServiceFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Typed error produced by the retry controller once a call has finally failed.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub attempts: u32,
    #[source]
    pub cause: Option<ServiceFailure>,
}

impl ApiError {
    pub fn from_failure(kind: ErrorKind, failure: ServiceFailure, attempts: u32) -> Self {
        Self {
            kind,
            message: failure.message.clone(),
            attempts,
            cause: Some(failure),
        }
    }

    pub fn cancelled(attempts: u32) -> Self {
        Self {
            kind: ErrorKind::Cancelled,
            message: "request cancelled".to_string(),
            attempts,
            cause: None,
        }
    }

    pub fn is_quota(&self) -> bool {
        self.kind == ErrorKind::QuotaExceeded
    }
}
