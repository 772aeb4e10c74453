use std::fmt;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::error::{DispatchError, ErrorKind};

pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_ERROR_MESSAGE_LENGTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// API base URL: http(s), has a host, carries no credentials, and always ends
/// in `/` so relative endpoints join under it instead of replacing the last
/// segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl(Url);

impl ValidatedUrl {
    pub fn new(url: impl Into<String>) -> Result<Self, HttpError> {
        let url = url.into();
        let invalid = |reason: &str| HttpError::InvalidUrl {
            url: truncate(&url, 100),
            reason: reason.to_string(),
        };

        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(invalid("URL cannot be empty"));
        }
        if trimmed.len() > MAX_URL_LENGTH {
            return Err(invalid("URL exceeds maximum length"));
        }

        let mut parsed = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(invalid("only 'http' and 'https' are allowed"));
        }
        if parsed.host_str().is_none() {
            return Err(invalid("URL must have a host"));
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(invalid("credentials in URL are not allowed"));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(invalid("base URL cannot carry a query or fragment"));
        }
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        Ok(Self(parsed))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn join(&self, endpoint: &str) -> Result<Url, HttpError> {
        self.0.join(endpoint).map_err(|e| HttpError::InvalidUrl {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })
    }
}

impl From<HttpError> for DispatchError {
    fn from(e: HttpError) -> Self {
        DispatchError::new(ErrorKind::Validation, e.to_string())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

// ============================================================================
// Response settling
// ============================================================================

fn transport_error(e: &impl fmt::Display) -> DispatchError {
    DispatchError::new(
        ErrorKind::Network,
        truncate(&e.to_string(), MAX_ERROR_MESSAGE_LENGTH),
    )
}

/// Pulls a readable message out of an error body: `{"error": "..."}` when the
/// API sends one, otherwise the raw text, otherwise the status reason.
fn error_message(body: &[u8], reason: &str) -> String {
    let text = String::from_utf8_lossy(body);
    let from_json = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string));
    let message = match from_json {
        Some(m) => m,
        None if text.trim().is_empty() => reason.to_string(),
        None => text.trim().to_string(),
    };
    truncate(&message, MAX_ERROR_MESSAGE_LENGTH)
}

/// Maps a status and decoded body onto the uniform `{error}` result shape.
pub(crate) fn from_parts<T>(status: u16, reason: &str, body: Option<T>) -> Result<T, DispatchError> {
    if !(200..300).contains(&status) {
        let err = DispatchError::from_status(status, reason);
        warn!(status, code = err.kind.code(), "API request failed");
        return Err(err);
    }
    body.ok_or_else(|| DispatchError::new(ErrorKind::Deserialization, "response had no body"))
}

/// Settles a JSON-bodied exchange into the decoded entity.
pub fn settle_json<T>(
    result: crux_http::Result<crux_http::Response<T>>,
) -> Result<T, DispatchError> {
    let mut response = result.map_err(|e| transport_error(&e))?;
    let status = response.status();
    from_parts(u16::from(status), status.canonical_reason(), response.take_body())
}

/// Settles an exchange whose body only matters when it carries an error.
pub fn settle_empty(
    result: crux_http::Result<crux_http::Response<Vec<u8>>>,
) -> Result<(), DispatchError> {
    let mut response = result.map_err(|e| transport_error(&e))?;
    let status = response.status();
    let code = u16::from(status);
    if (200..300).contains(&code) {
        return Ok(());
    }
    let body = response.take_body().unwrap_or_default();
    from_parts::<()>(code, &error_message(&body, status.canonical_reason()), None)
}
