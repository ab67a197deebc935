//! # Server Setup
//!
//! Server initialization, route registration, and HTTP server startup.
//!
//! This module provides the main server setup function that creates the
//! Axum router, registers all routes, applies middleware, and starts the
//! HTTP server. Configuration errors are the only fatal class: a missing
//! AI credential stops startup before the listener binds.

// region: --- Imports
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use lib_ai::{AiGateway, GeminiClient};
use lib_core::Config;

use crate::chat::{chat_websocket, ChatRouter};
use crate::handlers::{search_gifs, GifProxy};
use crate::middleware::log_requests;
// endregion: --- Imports

// region: --- AppState
/// Application state shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub chat: Arc<ChatRouter>,
    pub gifs: Arc<GifProxy>,
}

impl axum::extract::FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl axum::extract::FromRef<AppState> for Arc<ChatRouter> {
    fn from_ref(state: &AppState) -> Self {
        state.chat.clone()
    }
}

impl axum::extract::FromRef<AppState> for Arc<GifProxy> {
    fn from_ref(state: &AppState) -> Self {
        state.gifs.clone()
    }
}
// endregion: --- AppState

// region: --- Server Configuration
/// Server configuration
pub struct ServerConfig {
    /// Interface to bind; the port comes from the environment config.
    pub bind_host: String,
    /// Allowed CORS origins
    pub allowed_origins: Vec<String>,
    /// Directory holding the static client bundle
    pub public_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            allowed_origins: vec![
                "http://localhost:8000".to_string(),
                "http://127.0.0.1:8000".to_string(),
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            public_dir: "./public".to_string(),
        }
    }
}
// endregion: --- Server Configuration

// region: --- Server Setup
/// Initialize and start the HTTP server
///
/// # Errors
///
/// This function will return an error if:
/// - Configuration loading or validation fails (missing AI credential)
/// - The AI client cannot be constructed
/// - Server binding fails
pub async fn start_server(server_config: ServerConfig) -> anyhow::Result<()> {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::try_new(&log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global tracing subscriber");

    info!(" WORLD-CHAT SERVER STARTING");
    info!(" Log level: {}", log_level);

    dotenvy::dotenv().ok();

    info!("Loading configuration...");
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    info!("AI model: {}", config.gemini_model);
    if config.giphy_api_key.is_none() {
        warn!("GIPHY_API_KEY is not set - GIF search will answer with errors");
    }

    let provider = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone())
        .map_err(|e| anyhow::anyhow!("Failed to create AI client: {}", e))?;
    let gateway = Arc::new(AiGateway::new(Arc::new(provider), &config));

    let state = AppState {
        chat: Arc::new(ChatRouter::new(gateway, &config)),
        gifs: Arc::new(GifProxy::new(config.giphy_api_key.clone())?),
        config: config.clone(),
    };

    let origins = server_config
        .allowed_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let app = Router::new()
        .route("/ws", get(chat_websocket))
        .route("/api/gifs", get(search_gifs))
        .fallback_service(ServeDir::new(&server_config.public_dir))
        .layer(axum::middleware::from_fn(log_requests))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", server_config.bind_host, config.port);
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
// endregion: --- Server Setup
