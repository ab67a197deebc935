//! # Application Configuration
//!
//! This module manages application configuration loaded from environment
//! variables. All configuration is validated on startup to fail fast if
//! misconfigured.
//!
//! The generative-text credential (`GEMINI_API_KEY`) is the only required
//! variable: the process refuses to serve traffic without it. The GIF
//! provider credential is optional; GIF search degrades gracefully when it
//! is absent.

use std::env;

/// Default system instruction sent with every AI request.
const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant in a world-wide group chat. \
     Keep replies concise and conversational, a few sentences at most. \
     Maintain context from the conversation and reference earlier messages when relevant. \
     If you are unsure about something, say so rather than guessing.";

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    /// API key for the generative-text backend (required).
    pub gemini_api_key: String,

    /// Model identifier sent to the generative-text backend.
    pub gemini_model: String,

    /// System instruction prepended to every AI request.
    pub ai_system_prompt: String,

    /// Maximum output tokens per AI reply.
    pub ai_max_tokens: u32,

    /// Sampling temperature for AI replies.
    ///
    /// Valid range: 0.0-2.0.
    pub ai_temperature: f32,

    /// Maximum number of turns retained per conversation context.
    ///
    /// Bounds both memory use and AI request size. Oldest turns are
    /// trimmed first. Must be at least 2 (one full exchange).
    pub ai_context_window: usize,

    /// Upper bound in seconds on a single AI backend call.
    pub ai_timeout_secs: u64,

    /// API key for the GIF search provider (optional).
    ///
    /// When unset, `/api/gifs` answers with an error and a warning is
    /// logged at startup.
    pub giphy_api_key: Option<String>,

    /// TCP port the server listens on.
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let gemini_api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| "GEMINI_API_KEY must be set in environment")?;

        let gemini_model =
            env::var("AI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());

        let ai_system_prompt = env::var("AI_SYSTEM_PROMPT")
            .unwrap_or_else(|_| DEFAULT_SYSTEM_PROMPT.to_string());

        let ai_max_tokens = env::var("AI_MAX_TOKENS")
            .unwrap_or_else(|_| "500".to_string())
            .parse()
            .map_err(|e| format!("AI_MAX_TOKENS must be a valid number: {}", e))?;

        let ai_temperature = env::var("AI_TEMPERATURE")
            .unwrap_or_else(|_| "0.5".to_string())
            .parse()
            .map_err(|e| format!("AI_TEMPERATURE must be a valid number: {}", e))?;

        let ai_context_window = env::var("AI_CONTEXT_WINDOW")
            .unwrap_or_else(|_| "40".to_string())
            .parse()
            .map_err(|e| format!("AI_CONTEXT_WINDOW must be a valid number: {}", e))?;

        let ai_timeout_secs = env::var("AI_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|e| format!("AI_TIMEOUT_SECS must be a valid number: {}", e))?;

        let giphy_api_key = env::var("GIPHY_API_KEY").ok().filter(|k| !k.is_empty());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|e| format!("PORT must be a valid port number: {}", e))?;

        Ok(Self {
            gemini_api_key,
            gemini_model,
            ai_system_prompt,
            ai_max_tokens,
            ai_temperature,
            ai_context_window,
            ai_timeout_secs,
            giphy_api_key,
            port,
        })
    }

    /// Validate configuration values against business rules.
    pub fn validate(&self) -> Result<(), String> {
        if self.gemini_api_key.trim().is_empty() {
            return Err("GEMINI_API_KEY must not be empty".to_string());
        }

        if self.gemini_model.trim().is_empty() {
            return Err("AI_MODEL must not be empty".to_string());
        }

        if !(0.0..=2.0).contains(&self.ai_temperature) {
            return Err("AI_TEMPERATURE must be between 0.0 and 2.0".to_string());
        }

        if self.ai_context_window < 2 {
            return Err("AI_CONTEXT_WINDOW must be at least 2 turns".to_string());
        }

        if self.ai_timeout_secs == 0 {
            return Err("AI_TIMEOUT_SECS must be at least 1 second".to_string());
        }

        Ok(())
    }
}
