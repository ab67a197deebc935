//! # Conversation Context Store
//!
//! Owns per-participant private AI conversation state and the single
//! shared public conversation.
//!
//! A context handle is an `Arc<Mutex<ConversationContext>>`; the mutex is
//! the per-context serialization point for history updates. Because AI
//! backend calls suspend, two queries against the same context can be in
//! flight at once; each one appends its question/answer pair as a single
//! update while holding the lock, so histories never interleave into
//! corrupted or duplicated turn sequences.
//!
//! History length is capped (see `AI_CONTEXT_WINDOW`); the oldest turns
//! are trimmed first so long-lived contexts stay bounded in memory and in
//! AI request size.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use super::ConnectionId;
use crate::error::{AppError, Result};

/// Role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// A single turn in a conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

/// Ordered turn history fed to the AI backend for conversational
/// continuity.
#[derive(Debug)]
pub struct ConversationContext {
    turns: Vec<Turn>,
    max_turns: usize,
}

impl ConversationContext {
    fn new(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns,
        }
    }

    /// The accumulated history, oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append one question/answer exchange as a single update.
    ///
    /// Callers must hold the context lock for the whole call, which is
    /// what keeps concurrent exchanges from interleaving. Oldest turns
    /// beyond the cap are dropped.
    pub fn append_exchange(&mut self, question: &str, answer: &str) {
        self.turns.push(Turn {
            role: TurnRole::User,
            text: question.to_string(),
        });
        self.turns.push(Turn {
            role: TurnRole::Assistant,
            text: answer.to_string(),
        });

        if self.turns.len() > self.max_turns {
            let excess = self.turns.len() - self.max_turns;
            self.turns.drain(..excess);
        }
    }
}

/// Shared handle to one conversation context.
pub type ContextHandle = Arc<Mutex<ConversationContext>>;

/// Store of all conversation contexts.
///
/// The public context is created once here and lives for the process
/// lifetime. Private contexts are created when a connection activates and
/// destroyed on disconnect; they are exclusively owned by that connection
/// and never visible to any other participant.
#[derive(Debug)]
pub struct ContextStore {
    max_turns: usize,
    public: ContextHandle,
    private: RwLock<HashMap<ConnectionId, ContextHandle>>,
}

impl ContextStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            public: Arc::new(Mutex::new(ConversationContext::new(max_turns))),
            private: RwLock::new(HashMap::new()),
        }
    }

    /// The shared public context. Always available.
    pub fn public(&self) -> ContextHandle {
        Arc::clone(&self.public)
    }

    /// Initialize an empty private context for a connection.
    ///
    /// # Errors
    ///
    /// [`AppError::AlreadyExists`] when a context already exists for the
    /// connection (defensive invariant check).
    pub async fn create_private(&self, connection_id: ConnectionId) -> Result<()> {
        let mut private = self.private.write().await;
        if private.contains_key(&connection_id) {
            return Err(AppError::AlreadyExists(format!(
                "private context for connection {}",
                connection_id
            )));
        }
        private.insert(
            connection_id,
            Arc::new(Mutex::new(ConversationContext::new(self.max_turns))),
        );
        Ok(())
    }

    /// Look up a connection's private context.
    ///
    /// `None` signals the session is gone (disconnect or reconnect race);
    /// callers reply with a recoverable session error rather than crash.
    pub async fn private(&self, connection_id: ConnectionId) -> Option<ContextHandle> {
        self.private.read().await.get(&connection_id).cloned()
    }

    /// Release a connection's private context. Idempotent.
    pub async fn destroy_private(&self, connection_id: ConnectionId) {
        self.private.write().await.remove(&connection_id);
    }

    /// Number of live private contexts.
    pub async fn private_count(&self) -> usize {
        self.private.read().await.len()
    }
}
