//! # Provider Trait
//!
//! Interface that every generative-text backend implementation must
//! satisfy. Implementations are stateless across calls; conversational
//! continuity comes entirely from the history carried in each request.

use async_trait::async_trait;

use lib_core::session::Turn;

use crate::error::AiError;

/// Request to generate one reply from the backend.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// System instruction prepended to the conversation.
    pub system: String,
    /// Accumulated conversation history, oldest first.
    pub history: Vec<Turn>,
    /// The new user turn.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum output tokens.
    pub max_tokens: u32,
}

/// A generative-text backend.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Generate a single reply for the request.
    ///
    /// Returns the raw reply text; callers decide what to do with
    /// whitespace and emptiness.
    async fn generate(&self, request: GenerateRequest) -> Result<String, AiError>;
}
