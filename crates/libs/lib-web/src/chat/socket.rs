//! # Chat WebSocket Transport
//!
//! HTTP endpoint that upgrades to a WebSocket and drives one connection
//! through the session lifecycle: identity handshake, activation, event
//! loop, teardown.
//!
//! Each connection gets two companion tasks: a writer that forwards
//! router events to the socket, and a single-consumer AI worker so one
//! participant's queries run in order while other participants' queries
//! stay concurrently in flight. Chat messages are handled inline on the
//! read loop; fan-out never suspends on network I/O, so processing
//! order is arrival order.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use lib_core::dto::{ClientEvent, Identity, ServerEvent};
use lib_core::{AppError, ConnectionId};

use super::router::ChatRouter;

/// How long a fresh connection may take to present its identity.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket handler for the chat session.
///
/// **Route**: `GET /ws`
pub async fn chat_websocket(
    ws: WebSocketUpgrade,
    State(router): State<Arc<ChatRouter>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, router))
}

async fn handle_socket(socket: WebSocket, router: Arc<ChatRouter>) {
    let connection_id = ConnectionId::new();
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Identity handshake: the first frame must be a join event. A
    // connection that fails here never becomes active and triggers no
    // presence notification.
    let identity = match wait_for_join(&mut ws_rx).await {
        Ok(identity) => identity,
        Err(err) => {
            debug!(%connection_id, "Handshake rejected: {}", err);
            send_event(&mut ws_tx, &ServerEvent::from_error(&err)).await;
            let _ = ws_tx.close().await;
            return;
        }
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();

    if let Err(err) = router.connect(connection_id, identity, event_tx).await {
        debug!(%connection_id, "Activation rejected: {}", err);
        send_event(&mut ws_tx, &ServerEvent::from_error(&err)).await;
        let _ = ws_tx.close().await;
        return;
    }

    // Writer task: forwards router events to the socket. A send failure
    // means the socket is gone; the event is discarded, never retried.
    let writer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(_) => continue,
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Per-connection AI queue: queries suspend on the backend, so they
    // run off the read loop on a single worker. Same-connection queries
    // serialize; queries left in the queue at disconnect are dropped by
    // the router's liveness check.
    let (ai_tx, mut ai_rx) = mpsc::unbounded_channel::<(String, bool)>();
    tokio::spawn({
        let router = Arc::clone(&router);
        async move {
            while let Some((question, is_public)) = ai_rx.recv().await {
                router.handle_ai_query(connection_id, question, is_public).await;
            }
        }
    });

    while let Some(frame) = ws_rx.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(_) => break,
        };

        match message {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(ClientEvent::Chat { text }) => {
                    router.handle_chat(connection_id, text).await;
                }
                Ok(ClientEvent::AiQuery {
                    question,
                    is_public,
                }) => {
                    let _ = ai_tx.send((question, is_public));
                }
                Ok(ClientEvent::Join(_)) => {
                    debug!(%connection_id, "Ignoring repeated join on active connection");
                }
                Err(err) => {
                    debug!(%connection_id, "Ignoring malformed frame: {}", err);
                }
            },
            Message::Close(_) => break,
            // Ping/pong is answered by the framework; binary frames are
            // not part of the protocol.
            _ => {}
        }
    }

    drop(ai_tx);
    router.disconnect(connection_id).await;
    // The router dropped this connection's sender, so the writer drains
    // and exits on its own.
    let _ = writer.await;

    info!(%connection_id, "Connection closed");
}

/// Read frames until the identity handshake arrives.
async fn wait_for_join(ws_rx: &mut SplitStream<WebSocket>) -> Result<Identity, AppError> {
    let deadline = tokio::time::sleep(HANDSHAKE_TIMEOUT);
    tokio::pin!(deadline);

    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            _ = &mut deadline => {
                return Err(AppError::InvalidIdentity(
                    "No identity received before the handshake deadline".to_string(),
                ));
            }
        };

        let Some(Ok(message)) = frame else {
            return Err(AppError::InvalidIdentity(
                "Connection closed before identifying".to_string(),
            ));
        };

        match message {
            Message::Text(text) => {
                return match serde_json::from_str::<ClientEvent>(text.as_str()) {
                    Ok(ClientEvent::Join(identity)) => Ok(identity),
                    Ok(_) => Err(AppError::InvalidIdentity(
                        "The first event must be a join handshake".to_string(),
                    )),
                    Err(err) => Err(AppError::InvalidIdentity(format!(
                        "Malformed join event: {}",
                        err
                    ))),
                };
            }
            Message::Close(_) => {
                return Err(AppError::InvalidIdentity(
                    "Connection closed before identifying".to_string(),
                ));
            }
            // Skip ping/pong while waiting for the handshake.
            _ => continue,
        }
    }
}

async fn send_event(ws_tx: &mut SplitSink<WebSocket, Message>, event: &ServerEvent) {
    if let Ok(json) = serde_json::to_string(event) {
        let _ = ws_tx.send(Message::Text(json.into())).await;
    }
}
