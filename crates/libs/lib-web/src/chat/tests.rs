//! # Message Router Tests
//!
//! Scenario tests that drive the router the way the WebSocket transport
//! does, with in-process channels standing in for sockets and a scripted
//! provider standing in for the AI backend. No network anywhere.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use lib_ai::{AiError, AiGateway, GenerateRequest, TextProvider};
use lib_core::dto::{Identity, ServerEvent};
use lib_core::{Config, ConnectionId};

use super::router::{ChatRouter, MAX_MESSAGE_LENGTH};

fn test_config() -> Config {
    Config {
        gemini_api_key: "test-api-key".to_string(),
        gemini_model: "gemini-2.0-flash".to_string(),
        ai_system_prompt: "be brief".to_string(),
        ai_max_tokens: 500,
        ai_temperature: 0.5,
        ai_context_window: 40,
        ai_timeout_secs: 30,
        giphy_api_key: None,
        port: 8000,
    }
}

/// Provider that always answers with the same text and counts calls.
struct FixedProvider {
    reply: Result<String, ()>,
    calls: Mutex<usize>,
}

impl FixedProvider {
    fn ok(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            calls: Mutex::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Err(()),
            calls: Mutex::new(0),
        })
    }

    async fn call_count(&self) -> usize {
        *self.calls.lock().await
    }
}

#[async_trait]
impl TextProvider for FixedProvider {
    async fn generate(&self, _request: GenerateRequest) -> Result<String, AiError> {
        *self.calls.lock().await += 1;
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(()) => Err(AiError::Http {
                status: 503,
                body: "backend down".to_string(),
            }),
        }
    }
}

/// Provider whose replies are released by the test, keeping calls in
/// flight for as long as needed.
struct RemoteControlledProvider {
    replies: Mutex<mpsc::UnboundedReceiver<Result<String, AiError>>>,
}

impl RemoteControlledProvider {
    fn new() -> (Arc<Self>, mpsc::UnboundedSender<Result<String, AiError>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                replies: Mutex::new(rx),
            }),
            tx,
        )
    }
}

#[async_trait]
impl TextProvider for RemoteControlledProvider {
    async fn generate(&self, _request: GenerateRequest) -> Result<String, AiError> {
        self.replies
            .lock()
            .await
            .recv()
            .await
            .unwrap_or(Err(AiError::EmptyReply))
    }
}

fn test_router(provider: Arc<dyn TextProvider>) -> Arc<ChatRouter> {
    let config = test_config();
    let gateway = Arc::new(AiGateway::new(provider, &config));
    Arc::new(ChatRouter::new(gateway, &config))
}

/// An in-process stand-in for one connected client.
struct TestClient {
    id: ConnectionId,
    rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl TestClient {
    fn next(&mut self) -> ServerEvent {
        self.rx.try_recv().expect("expected a pending event")
    }

    fn assert_idle(&mut self) {
        assert!(
            self.rx.try_recv().is_err(),
            "expected no pending events for this client"
        );
    }
}

async fn join(router: &ChatRouter, user_id: &str, display_name: &str) -> TestClient {
    let id = ConnectionId::new();
    let (tx, rx) = mpsc::unbounded_channel();
    router
        .connect(
            id,
            Identity {
                user_id: user_id.to_string(),
                display_name: display_name.to_string(),
            },
            tx,
        )
        .await
        .expect("join should succeed");
    TestClient { id, rx }
}

#[tokio::test]
async fn test_presence_counts_on_join_and_leave() {
    let router = test_router(FixedProvider::ok("unused"));

    // Arrange/Act: A joins alone.
    let mut a = join(&router, "u-a", "Alice").await;

    // Assert: the joiner receives the count including itself.
    assert_eq!(a.next(), ServerEvent::PresenceCount { count: 1 });

    let mut b = join(&router, "u-b", "Bob").await;
    assert_eq!(a.next(), ServerEvent::PresenceCount { count: 2 });
    assert_eq!(b.next(), ServerEvent::PresenceCount { count: 2 });

    // A leaves: only the remainder is notified.
    router.disconnect(a.id).await;
    assert_eq!(b.next(), ServerEvent::PresenceCount { count: 1 });
    a.assert_idle();
}

#[tokio::test]
async fn test_failed_join_leaves_no_trace() {
    let router = test_router(FixedProvider::ok("unused"));
    let mut a = join(&router, "u-a", "Alice").await;
    a.next();

    let id = ConnectionId::new();
    let (tx, _rx) = mpsc::unbounded_channel();
    let result = router
        .connect(
            id,
            Identity {
                user_id: String::new(),
                display_name: "Ghost".to_string(),
            },
            tx,
        )
        .await;

    assert!(result.is_err());
    assert_eq!(router.registry.count().await, 1);
    assert!(router.contexts.private(id).await.is_none());
    // No presence notification for a connection that never activated.
    a.assert_idle();
}

#[tokio::test]
async fn test_chat_broadcast_excludes_sender() {
    let router = test_router(FixedProvider::ok("unused"));
    let mut a = join(&router, "u-a", "Alice").await;
    let mut b = join(&router, "u-b", "Bob").await;
    a.next();
    a.next();
    b.next();

    router.handle_chat(a.id, "hi".to_string()).await;

    match b.next() {
        ServerEvent::ChatBroadcast { sender, text, .. } => {
            // Identity is attached server-side from the registry.
            assert_eq!(sender, "Alice");
            assert_eq!(text, "hi");
        }
        other => panic!("Expected chat broadcast, got {:?}", other),
    }
    b.assert_idle();

    // The sender only gets an acknowledgement, never its own broadcast.
    assert!(matches!(a.next(), ServerEvent::ChatAck { .. }));
    a.assert_idle();
}

#[tokio::test]
async fn test_chat_from_inactive_connection_is_dropped() {
    let router = test_router(FixedProvider::ok("unused"));
    let mut b = join(&router, "u-b", "Bob").await;
    b.next();

    router
        .handle_chat(ConnectionId::new(), "anyone there?".to_string())
        .await;

    b.assert_idle();
}

#[tokio::test]
async fn test_oversized_or_empty_chat_rejected_to_sender_only() {
    let router = test_router(FixedProvider::ok("unused"));
    let mut a = join(&router, "u-a", "Alice").await;
    let mut b = join(&router, "u-b", "Bob").await;
    a.next();
    a.next();
    b.next();

    router.handle_chat(a.id, "   ".to_string()).await;
    router
        .handle_chat(a.id, "x".repeat(MAX_MESSAGE_LENGTH + 1))
        .await;

    for _ in 0..2 {
        match a.next() {
            ServerEvent::Error { code, .. } => assert_eq!(code, "InvalidInput"),
            other => panic!("Expected error event, got {:?}", other),
        }
    }
    b.assert_idle();
}

#[tokio::test]
async fn test_private_query_answers_asker_only() {
    let provider = FixedProvider::ok("The answer is 4.");
    let router = test_router(provider.clone());
    let mut a = join(&router, "u-a", "Alice").await;
    let mut b = join(&router, "u-b", "Bob").await;
    a.next();
    a.next();
    b.next();

    router
        .handle_ai_query(a.id, "2+2?".to_string(), false)
        .await;

    assert_eq!(a.next(), ServerEvent::ai_answer("The answer is 4."));
    a.assert_idle();
    b.assert_idle();

    // The exchange landed in A's private context, not the public one.
    let private = router.contexts.private(a.id).await.unwrap();
    assert_eq!(private.lock().await.len(), 2);
    assert!(router.contexts.public().lock().await.is_empty());
}

#[tokio::test]
async fn test_private_query_without_context_is_session_error() {
    let provider = FixedProvider::ok("unused");
    let router = test_router(provider.clone());
    let mut a = join(&router, "u-a", "Alice").await;
    a.next();

    // Simulated expiry: the context is gone while the registration
    // still exists.
    router.contexts.destroy_private(a.id).await;

    router
        .handle_ai_query(a.id, "2+2?".to_string(), false)
        .await;

    match a.next() {
        ServerEvent::AiReply { answer, error } => {
            assert!(answer.is_none());
            assert!(error.unwrap().contains("reconnect"));
        }
        other => panic!("Expected AI reply, got {:?}", other),
    }

    // No backend call, no turn appended anywhere.
    assert_eq!(provider.call_count().await, 0);
    assert!(router.contexts.public().lock().await.is_empty());
}

#[tokio::test]
async fn test_public_query_announces_to_others_only() {
    let router = test_router(FixedProvider::ok("The answer is 4."));
    let mut a = join(&router, "u-a", "Alice").await;
    let mut b = join(&router, "u-b", "Bob").await;
    a.next();
    a.next();
    b.next();

    router.handle_ai_query(a.id, "2+2?".to_string(), true).await;

    // The asker gets the bare reply, not the announcement form.
    assert_eq!(a.next(), ServerEvent::ai_answer("The answer is 4."));
    a.assert_idle();

    match b.next() {
        ServerEvent::AiPublicAnnouncement {
            asker,
            question,
            answer,
            error,
        } => {
            assert_eq!(asker, "Alice");
            assert_eq!(question, "2+2?");
            assert_eq!(answer.unwrap(), "The answer is 4.");
            assert!(error.is_none());
        }
        other => panic!("Expected public announcement, got {:?}", other),
    }
    b.assert_idle();

    assert_eq!(router.contexts.public().lock().await.len(), 2);
}

#[tokio::test]
async fn test_failed_public_query_broadcasts_degraded_announcement() {
    let router = test_router(FixedProvider::failing());
    let mut a = join(&router, "u-a", "Alice").await;
    let mut b = join(&router, "u-b", "Bob").await;
    a.next();
    a.next();
    b.next();

    router.handle_ai_query(a.id, "2+2?".to_string(), true).await;

    match a.next() {
        ServerEvent::AiReply { answer, error } => {
            assert!(answer.is_none());
            let message = error.unwrap();
            // Internal detail never reaches the user.
            assert!(!message.contains("backend down"));
            assert!(!message.contains("503"));
        }
        other => panic!("Expected AI reply, got {:?}", other),
    }

    match b.next() {
        ServerEvent::AiPublicAnnouncement { answer, error, .. } => {
            assert!(answer.is_none());
            assert!(error.is_some());
        }
        other => panic!("Expected public announcement, got {:?}", other),
    }

    // Failure commits nothing to the shared history.
    assert!(router.contexts.public().lock().await.is_empty());
}

#[tokio::test]
async fn test_sequential_public_queries_accumulate_two_turns_each() {
    let router = test_router(FixedProvider::ok("ok"));
    let mut a = join(&router, "u-a", "Alice").await;
    let mut b = join(&router, "u-b", "Bob").await;
    a.next();
    a.next();
    b.next();

    router.handle_ai_query(a.id, "q1".to_string(), true).await;
    router.handle_ai_query(b.id, "q2".to_string(), true).await;
    router.handle_ai_query(a.id, "q3".to_string(), true).await;

    // 2N turns after N queries, regardless of which connection asked.
    assert_eq!(router.contexts.public().lock().await.len(), 6);
}

#[tokio::test]
async fn test_disconnect_mid_flight_discards_reply() {
    let (provider, replies) = RemoteControlledProvider::new();
    let router = test_router(provider);
    let mut a = join(&router, "u-a", "Alice").await;
    let mut b = join(&router, "u-b", "Bob").await;
    a.next();
    a.next();
    b.next();

    // A's private query reaches the backend and stays in flight.
    let query = tokio::spawn({
        let router = Arc::clone(&router);
        let id = a.id;
        async move { router.handle_ai_query(id, "2+2?".to_string(), false).await }
    });
    tokio::task::yield_now().await;

    router.disconnect(a.id).await;
    assert_eq!(b.next(), ServerEvent::PresenceCount { count: 1 });

    // The backend resolves after the session is gone.
    replies.send(Ok("too late".to_string())).unwrap();
    query.await.expect("query handling must not panic");

    // The reply is discarded: nothing for A, nothing for B, no revived
    // session state.
    assert!(a.rx.try_recv().is_err());
    b.assert_idle();
    assert!(router.contexts.private(a.id).await.is_none());
    assert_eq!(router.registry.count().await, 1);
}

#[tokio::test]
async fn test_query_after_disconnect_is_dropped() {
    let provider = FixedProvider::ok("unused");
    let router = test_router(provider.clone());
    let mut a = join(&router, "u-a", "Alice").await;
    a.next();

    router.disconnect(a.id).await;
    router.disconnect(a.id).await; // idempotent

    router
        .handle_ai_query(a.id, "still there?".to_string(), true)
        .await;

    assert_eq!(provider.call_count().await, 0);
    assert!(a.rx.try_recv().is_err());
}
