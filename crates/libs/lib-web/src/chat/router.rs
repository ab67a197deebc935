//! # Message Router
//!
//! Receives inbound events (join, chat message, AI query, disconnect)
//! and produces outbound events (broadcast, AI reply, public
//! announcement, presence count).
//!
//! The router is the only writer of the registry and context store, and
//! every handler checks liveness through the registry before acting: a
//! chat message or AI query that arrives after disconnect processing has
//! started is dropped silently. Per-event errors are converted into
//! targeted reply events here; nothing escapes to crash the process or
//! touch another connection's state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use lib_ai::AiGateway;
use lib_core::dto::{Identity, ServerEvent};
use lib_core::session::{ContextStore, Participant, ParticipantRegistry};
use lib_core::{AppError, Config, ConnectionId, Result};

/// Upper bound on an accepted chat message, in bytes.
pub const MAX_MESSAGE_LENGTH: usize = 10_000;

/// The central event dispatcher for the chat service.
pub struct ChatRouter {
    pub(crate) registry: ParticipantRegistry,
    pub(crate) contexts: ContextStore,
    gateway: Arc<AiGateway>,
    connections: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl ChatRouter {
    pub fn new(gateway: Arc<AiGateway>, config: &Config) -> Self {
        Self {
            registry: ParticipantRegistry::new(),
            contexts: ContextStore::new(config.ai_context_window),
            gateway,
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Activate a connection after its identity handshake.
    ///
    /// Registers the participant, wires the outbound sender, creates the
    /// private conversation context, and broadcasts the new presence
    /// count to everyone including the joiner. On any failure the
    /// connection stays fully deactivated, with no registration left
    /// behind without a context or vice versa.
    pub async fn connect(
        &self,
        connection_id: ConnectionId,
        identity: Identity,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) -> Result<Participant> {
        let participant = self.registry.register(connection_id, identity).await?;

        self.connections.write().await.insert(connection_id, sender);

        if let Err(err) = self.contexts.create_private(connection_id).await {
            self.connections.write().await.remove(&connection_id);
            self.registry.unregister(connection_id).await;
            return Err(err);
        }

        info!(
            %connection_id,
            display_name = %participant.display_name,
            "Participant joined"
        );
        self.broadcast_presence().await;

        Ok(participant)
    }

    /// Tear down a connection. Idempotent: repeated calls for the same
    /// connection are no-ops.
    pub async fn disconnect(&self, connection_id: ConnectionId) {
        self.connections.write().await.remove(&connection_id);
        let removed = self.registry.unregister(connection_id).await;
        self.contexts.destroy_private(connection_id).await;

        if let Some(participant) = removed {
            info!(
                %connection_id,
                display_name = %participant.display_name,
                "Participant left"
            );
            self.broadcast_presence().await;
        }
    }

    /// Broadcast a chat message to every other active connection and
    /// acknowledge delivery to the sender.
    ///
    /// Sender identity is attached here from the registry, never from
    /// the client payload. Fire-and-forget: no retry, no dedup.
    pub async fn handle_chat(&self, connection_id: ConnectionId, text: String) {
        let Some(sender) = self.registry.lookup(connection_id).await else {
            debug!(%connection_id, "Dropping chat message from inactive connection");
            return;
        };

        if text.trim().is_empty() || text.len() > MAX_MESSAGE_LENGTH {
            let err = AppError::InvalidInput(format!(
                "Messages must be between 1 and {} characters",
                MAX_MESSAGE_LENGTH
            ));
            self.send_to(connection_id, ServerEvent::from_error(&err)).await;
            return;
        }

        let timestamp = Utc::now();
        self.broadcast_except(
            connection_id,
            ServerEvent::ChatBroadcast {
                sender: sender.display_name,
                text,
                timestamp,
            },
        )
        .await;
        self.send_to(connection_id, ServerEvent::ChatAck { timestamp })
            .await;
    }

    /// Answer an AI query against the shared public context or the
    /// asker's private context.
    pub async fn handle_ai_query(
        &self,
        connection_id: ConnectionId,
        question: String,
        is_public: bool,
    ) {
        let Some(asker) = self.registry.lookup(connection_id).await else {
            debug!(%connection_id, "Dropping AI query from inactive connection");
            return;
        };

        let question = question.trim().to_string();
        if question.is_empty() {
            let err = AppError::InvalidInput("A question is required".to_string());
            self.send_to(connection_id, ServerEvent::from_error(&err)).await;
            return;
        }

        if is_public {
            self.handle_public_query(asker, question).await;
        } else {
            self.handle_private_query(asker, question).await;
        }
    }

    async fn handle_public_query(&self, asker: Participant, question: String) {
        let context = self.contexts.public();

        match self.gateway.ask(&context, &question).await {
            Ok(answer) => {
                // The exchange is committed to the shared history either
                // way, but if the asker vanished while the call was in
                // flight, nothing is announced on their behalf.
                if !self.registry.is_active(asker.connection_id).await {
                    debug!(
                        connection_id = %asker.connection_id,
                        "Discarding public AI reply for disconnected asker"
                    );
                    return;
                }
                self.send_to(asker.connection_id, ServerEvent::ai_answer(answer.clone()))
                    .await;
                self.broadcast_except(
                    asker.connection_id,
                    ServerEvent::AiPublicAnnouncement {
                        asker: asker.display_name,
                        question,
                        answer: Some(answer),
                        error: None,
                    },
                )
                .await;
            }
            Err(err) => {
                warn!(
                    connection_id = %asker.connection_id,
                    "Public AI query failed: {}",
                    err
                );
                let message = AppError::from(err).user_message();
                if !self.registry.is_active(asker.connection_id).await {
                    return;
                }
                self.send_to(asker.connection_id, ServerEvent::ai_error(message.clone()))
                    .await;
                // Degraded announcement so the room is not left wondering
                // why the asker went silent.
                self.broadcast_except(
                    asker.connection_id,
                    ServerEvent::AiPublicAnnouncement {
                        asker: asker.display_name,
                        question,
                        answer: None,
                        error: Some(message),
                    },
                )
                .await;
            }
        }
    }

    async fn handle_private_query(&self, asker: Participant, question: String) {
        let Some(context) = self.contexts.private(asker.connection_id).await else {
            // Reconnect race: the session is gone. Recoverable, so the
            // asker gets a reply telling them to reconnect.
            let err = AppError::SessionNotFound(format!(
                "private context for connection {}",
                asker.connection_id
            ));
            warn!(connection_id = %asker.connection_id, "{}", err);
            self.send_to(asker.connection_id, ServerEvent::ai_error(err.user_message()))
                .await;
            return;
        };

        match self.gateway.ask(&context, &question).await {
            Ok(answer) => {
                self.send_to(asker.connection_id, ServerEvent::ai_answer(answer))
                    .await;
            }
            Err(err) => {
                warn!(
                    connection_id = %asker.connection_id,
                    "Private AI query failed: {}",
                    err
                );
                let message = AppError::from(err).user_message();
                self.send_to(asker.connection_id, ServerEvent::ai_error(message))
                    .await;
            }
        }
    }

    /// Send an event to one connection; silently dropped when the
    /// connection is gone.
    async fn send_to(&self, connection_id: ConnectionId, event: ServerEvent) {
        if let Some(sender) = self.connections.read().await.get(&connection_id) {
            let _ = sender.send(event);
        }
    }

    /// Fan an event out to every active connection except the origin.
    async fn broadcast_except(&self, origin: ConnectionId, event: ServerEvent) {
        let connections = self.connections.read().await;
        for (connection_id, sender) in connections.iter() {
            if *connection_id != origin {
                let _ = sender.send(event.clone());
            }
        }
    }

    /// Broadcast the presence count as of this moment to everyone.
    async fn broadcast_presence(&self) {
        let count = self.registry.count().await;
        let connections = self.connections.read().await;
        for sender in connections.values() {
            let _ = sender.send(ServerEvent::PresenceCount { count });
        }
    }
}
