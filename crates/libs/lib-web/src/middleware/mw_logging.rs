//! # Request/Response Logging Middleware
//!
//! Logs method, path, response status, and latency for every HTTP
//! request. WebSocket upgrades appear here once, as the upgrade request.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/api/gifs", get(handler))
//!     .layer(axum::middleware::from_fn(log_requests));
//! ```

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{error, info, warn};

/// Request/response logging middleware.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let status = response.status();
    let latency_ms = start.elapsed().as_millis();

    if status.is_server_error() {
        error!(%method, %path, %status, latency_ms, "Request failed");
    } else if status.is_client_error() {
        warn!(%method, %path, %status, latency_ms, "Client error");
    } else {
        info!(%method, %path, %status, latency_ms, "Request handled");
    }

    response
}
