//! # Centralized Error Handling
//!
//! This module defines the application-wide error type [`AppError`] used
//! consistently across all backend modules. It follows the `thiserror`
//! pattern for ergonomic error handling.
//!
//! ## Error Categories
//!
//! 1. **Startup errors** (fatal) - the process must not serve traffic
//!    - [`Config`](AppError::Config)
//!
//! 2. **Handshake errors** - the connection never becomes active
//!    - [`InvalidIdentity`](AppError::InvalidIdentity)
//!    - [`DuplicateConnection`](AppError::DuplicateConnection) (defensive
//!      invariant; should not occur under correct transport semantics)
//!
//! 3. **Recoverable per-event errors** - surfaced to one participant as a
//!    targeted event, never fatal to the process
//!    - [`SessionNotFound`](AppError::SessionNotFound) → prompts a reconnect
//!    - [`AiUnavailable`](AppError::AiUnavailable) → friendly in-chat message
//!    - [`InvalidInput`](AppError::InvalidInput)
//!
//! 4. **HTTP-surface errors**
//!    - [`UpstreamProxy`](AppError::UpstreamProxy) → 500 with a generic body
//!
//! All per-event errors are caught at the router boundary and converted to
//! targeted reply events; an error in one connection's event handling never
//! affects other connections.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Convenience type alias for `Result<T, AppError>`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application-wide error type covering all error scenarios.
///
/// Each variant includes a descriptive `String` for context. The `#[error]`
/// attribute from `thiserror` provides the `Display` implementation.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error during startup or environment loading.
    ///
    /// The only fatal category: the process refuses to start.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Identity handshake rejected (missing or malformed user id /
    /// display name). The connection is closed without ever activating.
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// A connection id was registered twice.
    #[error("Duplicate connection: {0}")]
    DuplicateConnection(String),

    /// A private conversation context was created twice for one
    /// live connection.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// An operation referenced a session or context that no longer
    /// exists. Recoverable; the client should reconnect.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The generative-text backend failed, timed out, or returned an
    /// empty reply. Recoverable; surfaced as a friendly in-chat message.
    #[error("AI unavailable: {0}")]
    AiUnavailable(String),

    /// The GIF provider call failed or its credential is unset.
    #[error("Upstream proxy error: {0}")]
    UpstreamProxy(String),

    /// Invalid user input validation error.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error (unexpected failures).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidIdentity(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateConnection(_) | AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::AiUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::UpstreamProxy(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable taxonomy code used in wire events and HTTP bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "Config",
            AppError::InvalidIdentity(_) => "InvalidIdentity",
            AppError::DuplicateConnection(_) => "DuplicateConnection",
            AppError::AlreadyExists(_) => "AlreadyExists",
            AppError::SessionNotFound(_) => "SessionNotFound",
            AppError::AiUnavailable(_) => "AiUnavailable",
            AppError::UpstreamProxy(_) => "UpstreamProxy",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Internal(_) => "Internal",
        }
    }

    /// Get a user-friendly error message.
    ///
    /// Server-side categories return a generic message to avoid exposing
    /// implementation details.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidIdentity(msg) => msg.clone(),
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::SessionNotFound(_) => {
                "Your session has expired. Please reconnect and try again.".to_string()
            }
            AppError::AiUnavailable(_) => {
                "The AI assistant is unavailable right now. Please try again in a moment."
                    .to_string()
            }
            AppError::UpstreamProxy(_) => "GIF search is temporarily unavailable".to_string(),
            AppError::DuplicateConnection(_)
            | AppError::AlreadyExists(_)
            | AppError::Config(_)
            | AppError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

/// Implement Axum's `IntoResponse` for automatic error handling on the
/// HTTP surface (the GIF proxy).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.user_message();

        // Full error detail goes to the server logs only.
        match status {
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
                tracing::debug!("Client error: {}", self);
            }
            _ => {
                tracing::error!("Server error: {}", self);
            }
        }

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Convert `serde_json::Error` to `AppError`.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}
