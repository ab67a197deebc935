//! # Participant Registry
//!
//! Tracks currently connected participants and their identity.
//!
//! The registry is the single source of truth for liveness: the message
//! router checks it before acting on any event, rather than assuming the
//! transport prevents post-disconnect events. Mutations are serialized
//! behind one lock; none of the operations suspend on anything but that
//! lock, so the observable count is always consistent with the last
//! completed register/unregister.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::ConnectionId;
use crate::dto::Identity;
use crate::error::{AppError, Result};

/// Upper bound on the accepted display name length, in bytes.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 64;

/// A live chat connection with an associated display identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub connection_id: ConnectionId,
    /// Stable client-chosen identifier. Untrusted label, not verified.
    pub user_id: String,
    pub display_name: String,
}

/// Registry of currently connected participants.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    participants: RwLock<HashMap<ConnectionId, Participant>>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the identity and add the participant.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidIdentity`] when the user id or display name is
    ///   missing, blank, or over the length cap; the connection stays
    ///   unregistered.
    /// - [`AppError::DuplicateConnection`] when the connection id is
    ///   already present (defensive invariant check).
    pub async fn register(
        &self,
        connection_id: ConnectionId,
        identity: Identity,
    ) -> Result<Participant> {
        let user_id = identity.user_id.trim();
        let display_name = identity.display_name.trim();

        if user_id.is_empty() {
            return Err(AppError::InvalidIdentity(
                "A user id is required to join the chat".to_string(),
            ));
        }
        if display_name.is_empty() {
            return Err(AppError::InvalidIdentity(
                "A display name is required to join the chat".to_string(),
            ));
        }
        if display_name.len() > MAX_DISPLAY_NAME_LENGTH {
            return Err(AppError::InvalidIdentity(format!(
                "Display name must be at most {} characters",
                MAX_DISPLAY_NAME_LENGTH
            )));
        }

        let mut participants = self.participants.write().await;
        if participants.contains_key(&connection_id) {
            return Err(AppError::DuplicateConnection(connection_id.to_string()));
        }

        let participant = Participant {
            connection_id,
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
        };
        participants.insert(connection_id, participant.clone());

        Ok(participant)
    }

    /// Remove a participant. Idempotent: removing an absent connection
    /// returns `None` and changes nothing.
    pub async fn unregister(&self, connection_id: ConnectionId) -> Option<Participant> {
        self.participants.write().await.remove(&connection_id)
    }

    /// Look up a participant by connection id.
    pub async fn lookup(&self, connection_id: ConnectionId) -> Option<Participant> {
        self.participants.read().await.get(&connection_id).cloned()
    }

    /// Whether the connection is currently registered.
    pub async fn is_active(&self, connection_id: ConnectionId) -> bool {
        self.participants.read().await.contains_key(&connection_id)
    }

    /// Number of currently connected participants.
    pub async fn count(&self) -> usize {
        self.participants.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(user_id: &str, display_name: &str) -> Identity {
        Identity {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_and_count() {
        let registry = ParticipantRegistry::new();
        assert_eq!(registry.count().await, 0);

        let a = ConnectionId::new();
        let b = ConnectionId::new();

        registry.register(a, identity("u-a", "Alice")).await.unwrap();
        assert_eq!(registry.count().await, 1);

        registry.register(b, identity("u-b", "Bob")).await.unwrap();
        assert_eq!(registry.count().await, 2);

        assert!(registry.unregister(a).await.is_some());
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let registry = ParticipantRegistry::new();
        let a = ConnectionId::new();

        registry.register(a, identity("u-a", "Alice")).await.unwrap();
        assert!(registry.unregister(a).await.is_some());

        // Second removal is a no-op, not a failure, and never
        // decrements below the true count.
        assert!(registry.unregister(a).await.is_none());
        assert_eq!(registry.count().await, 0);

        assert!(registry.unregister(ConnectionId::new()).await.is_none());
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_connection_rejected() {
        let registry = ParticipantRegistry::new();
        let a = ConnectionId::new();

        registry.register(a, identity("u-a", "Alice")).await.unwrap();
        let err = registry
            .register(a, identity("u-a", "Alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateConnection(_)));
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_identity_rejected() {
        let registry = ParticipantRegistry::new();

        let err = registry
            .register(ConnectionId::new(), identity("", "Alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidIdentity(_)));

        let err = registry
            .register(ConnectionId::new(), identity("u-a", "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidIdentity(_)));

        let err = registry
            .register(ConnectionId::new(), identity("u-a", &"x".repeat(65)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidIdentity(_)));

        // Rejected identities leave the registry untouched.
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_lookup_returns_trimmed_identity() {
        let registry = ParticipantRegistry::new();
        let a = ConnectionId::new();

        registry
            .register(a, identity(" u-a ", "  Alice  "))
            .await
            .unwrap();

        let participant = registry.lookup(a).await.unwrap();
        assert_eq!(participant.user_id, "u-a");
        assert_eq!(participant.display_name, "Alice");

        assert!(registry.lookup(ConnectionId::new()).await.is_none());
    }
}
