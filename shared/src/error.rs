use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Conflict,
    RateLimited,
    Server,
    Deserialization,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Authentication => "AUTH_ERROR",
            Self::Authorization => "FORBIDDEN",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Server => "SERVER_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimited | Self::Server | Self::Conflict
        )
    }

    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::Validation,
            401 => Self::Authentication,
            403 => Self::Authorization,
            404 | 410 => Self::NotFound,
            408 => Self::Timeout,
            409 => Self::Conflict,
            429 => Self::RateLimited,
            500..=599 => Self::Server,
            _ => Self::Unknown,
        }
    }
}

/// Uniform failure result of a remote fetch or mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} ({}): {message}", .kind.code(), status_label(.status))]
pub struct DispatchError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: Option<u16>,
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "no status".to_string(), |s| s.to_string())
}

impl DispatchError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::from_status(status),
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] DispatchError),

    #[error("load superseded or cancelled")]
    Cancelled,
}

/// Local failures of the edit workflow. Remote dispatch failures are not
/// represented here; they surface as `SubmissionOutcome::Failure`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("{} field(s) failed validation", .0.len())]
    Validation(FieldErrors),

    #[error("form values are unchanged")]
    Unchanged,

    #[error("photos are still uploading")]
    UploadInProgress,

    #[error("a submission is already in flight")]
    Busy,

    #[error("form is not loaded yet")]
    NotLoaded,

    #[error("delete requires an existing entity")]
    NotEditing,

    #[error("cancelled by user")]
    UserCancelled,

    #[error("no delete confirmation is pending")]
    NotConfirming,

    #[error("load failed: {0}")]
    Load(#[from] LoadError),
}
