//! # AI Gateway
//!
//! Sends a prompt plus a conversation's accumulated history to the
//! backend and, on success, commits the question/answer pair to the
//! context as one atomic update.
//!
//! The gateway itself is stateless across calls. Because the backend call
//! suspends, two calls against the same context can be in flight at once;
//! the history snapshot is taken before the call and the exchange is
//! appended under the context lock afterwards, so concurrent calls never
//! interleave or lose turns. On any failure the context is left untouched
//! and a retry sees consistent history.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use lib_core::{Config, ContextHandle};

use crate::error::AiError;
use crate::provider::{GenerateRequest, TextProvider};

/// Gateway between conversation contexts and a generative-text backend.
pub struct AiGateway {
    provider: Arc<dyn TextProvider>,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl AiGateway {
    pub fn new(provider: Arc<dyn TextProvider>, config: &Config) -> Self {
        Self {
            provider,
            system_prompt: config.ai_system_prompt.clone(),
            temperature: config.ai_temperature,
            max_tokens: config.ai_max_tokens,
            timeout: Duration::from_secs(config.ai_timeout_secs),
        }
    }

    /// Ask the backend a question in the given conversation context.
    ///
    /// On success the question and the reply are appended to the context
    /// as a single update and the reply text is returned. On failure
    /// (HTTP error, timeout, empty reply) the context is unmodified.
    pub async fn ask(&self, context: &ContextHandle, question: &str) -> Result<String, AiError> {
        let history = {
            let guard = context.lock().await;
            guard.turns().to_vec()
        };

        let request = GenerateRequest {
            system: self.system_prompt.clone(),
            history,
            prompt: question.to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(turns = request.history.len(), "Calling AI backend");

        let reply = match tokio::time::timeout(self.timeout, self.provider.generate(request)).await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout = ?self.timeout, "AI backend call timed out");
                return Err(AiError::Timeout(self.timeout));
            }
        };

        let reply = reply.trim().to_string();
        if reply.is_empty() {
            return Err(AiError::EmptyReply);
        }

        context.lock().await.append_exchange(question, &reply);

        Ok(reply)
    }
}
