//! # Chat Wire Events
//!
//! Inbound and outbound events for the chat WebSocket connection.
//!
//! Inbound events ([`ClientEvent`]) arrive as JSON text frames; the first
//! frame on every connection must be `join` (the identity handshake).
//! Outbound events ([`ServerEvent`]) are fanned out by the message router;
//! sender identity on broadcasts is always attached server-side and never
//! taken from the client payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Client-chosen identity presented during the connection handshake.
///
/// `user_id` may persist across reconnects but is an untrusted label,
/// not a security principal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
}

/// Events a client may send over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Identity handshake; must be the first frame on the connection.
    Join(Identity),

    /// Plain chat message, broadcast verbatim to all other participants.
    Chat { text: String },

    /// Question for the AI assistant, against the shared public context
    /// or the sender's private context.
    AiQuery { question: String, is_public: bool },
}

/// Events the server may send to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// A chat message from another participant.
    ChatBroadcast {
        sender: String,
        text: String,
        timestamp: DateTime<Utc>,
    },

    /// Delivery acknowledgement for the sender's own chat message.
    ChatAck { timestamp: DateTime<Utc> },

    /// AI answer (or failure) for the asker only.
    AiReply {
        #[serde(skip_serializing_if = "Option::is_none")]
        answer: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// A public AI exchange, shown to every participant except the asker.
    AiPublicAnnouncement {
        asker: String,
        question: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        answer: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Number of currently connected participants, broadcast on every
    /// join and leave.
    PresenceCount { count: usize },

    /// Targeted error event.
    Error { code: String, message: String },
}

impl ServerEvent {
    /// Successful AI reply for the asker.
    pub fn ai_answer(answer: impl Into<String>) -> Self {
        ServerEvent::AiReply {
            answer: Some(answer.into()),
            error: None,
        }
    }

    /// Failed AI reply for the asker.
    pub fn ai_error(message: impl Into<String>) -> Self {
        ServerEvent::AiReply {
            answer: None,
            error: Some(message.into()),
        }
    }

    /// Targeted error event carrying the taxonomy code and the
    /// user-facing message of `err`.
    pub fn from_error(err: &AppError) -> Self {
        ServerEvent::Error {
            code: err.code().to_string(),
            message: err.user_message(),
        }
    }
}
