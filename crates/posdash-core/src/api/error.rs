//! Normalized gateway error.
//!
//! Every failure of a gateway call collapses into one `ApiError` carrying a
//! display message, so front ends have a single error rendering path.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::util::compact_text;

pub(crate) const TIMEOUT_MESSAGE: &str = "Request timeout - server is not responding";
pub(crate) const UNREACHABLE_MESSAGE: &str =
    "Network error - cannot reach server. Is the backend running?";
pub(crate) const NO_RESPONSE_MESSAGE: &str = "No response from server. Is the backend running?";
pub(crate) const SERVER_FALLBACK_MESSAGE: &str = "Server error";

/// Underlying cause, kept for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Timeout,
    Unreachable,
    Server,
    NoResponse,
    Malformed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    kind: ApiErrorKind,
    message: String,
    status: Option<u16>,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Classify a failure where no usable response was received.
    pub fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::new(ApiErrorKind::Timeout, TIMEOUT_MESSAGE)
        } else if error.is_connect() {
            Self::new(ApiErrorKind::Unreachable, UNREACHABLE_MESSAGE)
        } else if error.is_decode() {
            Self::new(
                ApiErrorKind::Malformed,
                format!("Invalid response from server: {}", compact_text(&error.to_string())),
            )
        } else {
            Self::new(ApiErrorKind::NoResponse, NO_RESPONSE_MESSAGE)
        }
    }

    /// Build the error for a non-success status.
    ///
    /// Message priority: the body's `error` field, then the status reason
    /// phrase, then a generic fallback.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = structured_error(body)
            .or_else(|| status.canonical_reason().map(ToString::to_string))
            .unwrap_or_else(|| SERVER_FALLBACK_MESSAGE.to_string());
        Self {
            kind: ApiErrorKind::Server,
            message,
            status: Some(status.as_u16()),
        }
    }

    pub const fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status for server-reported failures.
    pub const fn status(&self) -> Option<u16> {
        self.status
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<serde_json::Value>,
}

fn structured_error(body: &str) -> Option<String> {
    let payload = serde_json::from_str::<ErrorBody>(body).ok()?;
    match payload.error? {
        serde_json::Value::String(message) => {
            let message = message.trim();
            (!message.is_empty()).then(|| message.to_string())
        }
        _ => None,
    }
}
