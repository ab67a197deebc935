//! # Core Library
//!
//! Configuration, error taxonomy, wire DTOs, and the session layer
//! (participant registry and conversation context store) for the chat
//! service.

pub mod config;
pub mod dto;
pub mod error;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
pub use session::{
    ConnectionId, ContextHandle, ContextStore, Participant, ParticipantRegistry,
};
