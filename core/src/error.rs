//! Error types for the design API client.
//!
//! # Design
//! A failed call surfaces either before a response exists (`Transport`,
//! `Timeout`) or with one (`Http`). `Http` keeps the raw status and body and
//! pre-extracts the backend's `detail` message, since that field drives the
//! user-facing notification.

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by `ApiClient` methods and `Endpoints` parsers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, DNS, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {}", http_message(.detail, .body))]
    Http {
        status: u16,
        detail: Option<String>,
        body: String,
    },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The configured base URL is not a valid absolute URL.
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),
}

fn http_message<'a>(detail: &'a Option<String>, body: &'a str) -> &'a str {
    detail.as_deref().unwrap_or(body)
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

impl ApiError {
    /// Build an `Http` error from a failed response body. `detail` is only
    /// picked up when the body is a JSON object whose `detail` is a string.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let detail = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.detail)
            .and_then(|d| match d {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            });
        ApiError::Http {
            status,
            detail,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Http { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}
