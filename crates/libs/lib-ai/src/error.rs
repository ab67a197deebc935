//! # AI Backend Errors
//!
//! Failure modes of a generative-text backend call. Every variant belongs
//! to the single user-facing `AiUnavailable` category; the split exists
//! for server logs and tests, never for clients.

use std::time::Duration;

use lib_core::AppError;
use thiserror::Error;

/// Errors that can occur when calling the generative-text backend.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request failure or non-success status from the backend.
    #[error("HTTP error (status {status}): {body}")]
    Http { status: u16, body: String },

    /// The backend did not answer within the configured deadline.
    #[error("Backend call timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with no usable text.
    #[error("Backend returned an empty reply")]
    EmptyReply,

    /// The backend response could not be decoded.
    #[error("Malformed backend response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest's own timeout; the gateway deadline is reported
            // separately.
            return AiError::Timeout(Duration::ZERO);
        }
        AiError::Http {
            status: err.status().map(|s| s.as_u16()).unwrap_or(0),
            body: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AiError {
    fn from(err: serde_json::Error) -> Self {
        AiError::Malformed(err.to_string())
    }
}

/// Normalize every backend failure into the application taxonomy.
impl From<AiError> for AppError {
    fn from(err: AiError) -> Self {
        AppError::AiUnavailable(err.to_string())
    }
}
