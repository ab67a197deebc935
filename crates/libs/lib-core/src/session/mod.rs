//! # Session Layer
//!
//! Tracks who is connected and owns every AI conversation context.
//!
//! A [`Participant`] and its private conversation context share one
//! lifetime: both are created when a connection activates and destroyed
//! together on disconnect. All access goes through the contracted
//! operations of [`ParticipantRegistry`] and [`ContextStore`] so that
//! locking stays centralized; raw maps are never handed to event handlers.

// region: --- Modules
pub mod context;
pub mod registry;
// endregion: --- Modules

pub use context::{ContextHandle, ContextStore, ConversationContext, Turn, TurnRole};
pub use registry::{Participant, ParticipantRegistry};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque handle for one live transport connection.
///
/// Unique per connection; a reconnecting client gets a fresh id even when
/// it presents the same user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
