//! WebSocket API handler and connection management.
//!
//! Each connected client gets a bounded outbound queue and may join one or
//! more session rooms. The turn pipeline publishes events through the
//! [`ConnectionManager`]'s [`EventSink`] implementation; every event names
//! its destination session explicitly, so concurrent sessions never
//! cross-deliver.

use crate::AppState;
use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message as AxumMessage, WebSocket},
        Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use pitchlab_session::{EventSink, OutboundEvent};
use serde::Deserialize;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Incoming WebSocket message types.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum IncomingMessage {
    #[serde(rename = "join_voice_session")]
    JoinVoiceSession {
        #[serde(default)]
        session_id: String,
    },
    #[serde(rename = "user_audio")]
    UserAudio {
        #[serde(default)]
        session_id: String,
        #[serde(default)]
        text: String,
    },
    #[serde(rename = "end_voice_session")]
    EndVoiceSession {
        #[serde(default)]
        session_id: String,
    },
}

/// Manages active WebSocket connections and session-room membership.
#[derive(Clone, Default)]
pub struct ConnectionManager {
    /// Active connections: connection id -> outbound sender.
    connections: Arc<RwLock<HashMap<Uuid, mpsc::Sender<String>>>>,
    /// Room membership: session id -> set of connection ids.
    room_members: Arc<RwLock<HashMap<String, HashSet<Uuid>>>>,
    /// Reverse mapping: connection id -> set of session ids.
    connection_rooms: Arc<RwLock<HashMap<Uuid, HashSet<String>>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection and returns its id.
    pub async fn add_connection(&self, sender: mpsc::Sender<String>) -> Uuid {
        let connection_id = Uuid::new_v4();
        self.connections
            .write()
            .await
            .insert(connection_id, sender);
        connection_id
    }

    /// Removes a connection and all of its room memberships.
    ///
    /// Lock ordering: connections → room_members → connection_rooms. This
    /// matches `join`/`leave` to prevent deadlocks.
    pub async fn remove_connection(&self, connection_id: Uuid) {
        self.connections.write().await.remove(&connection_id);

        let rooms = {
            let connection_rooms = self.connection_rooms.read().await;
            connection_rooms.get(&connection_id).cloned()
        };

        if let Some(ref rooms) = rooms {
            let mut room_members = self.room_members.write().await;
            for session_id in rooms {
                if let Some(members) = room_members.get_mut(session_id) {
                    members.remove(&connection_id);
                    if members.is_empty() {
                        room_members.remove(session_id);
                    }
                }
            }
        }

        if rooms.is_some() {
            let mut connection_rooms = self.connection_rooms.write().await;
            connection_rooms.remove(&connection_id);
        }
    }

    /// Adds a connection to a session room.
    pub async fn join(&self, session_id: &str, connection_id: Uuid) {
        let mut room_members = self.room_members.write().await;
        room_members
            .entry(session_id.to_string())
            .or_default()
            .insert(connection_id);

        let mut connection_rooms = self.connection_rooms.write().await;
        connection_rooms
            .entry(connection_id)
            .or_default()
            .insert(session_id.to_string());
    }

    /// Removes a connection from a session room.
    pub async fn leave(&self, session_id: &str, connection_id: Uuid) {
        let mut room_members = self.room_members.write().await;
        if let Some(members) = room_members.get_mut(session_id) {
            members.remove(&connection_id);
            if members.is_empty() {
                room_members.remove(session_id);
            }
        }

        let mut connection_rooms = self.connection_rooms.write().await;
        if let Some(rooms) = connection_rooms.get_mut(&connection_id) {
            rooms.remove(session_id);
            if rooms.is_empty() {
                connection_rooms.remove(&connection_id);
            }
        }
    }

    /// Broadcasts a message string to every member of a session room.
    pub async fn broadcast(&self, session_id: &str, message_json: String) {
        let room_members = self.room_members.read().await;
        if let Some(members) = room_members.get(session_id) {
            let connections = self.connections.read().await;
            for connection_id in members {
                if let Some(sender) = connections.get(connection_id) {
                    if let Err(e) = sender.try_send(message_json.clone()) {
                        tracing::warn!(
                            connection_id = %connection_id,
                            session_id = %session_id,
                            "dropping broadcast message for slow consumer: {}",
                            e
                        );
                    }
                }
            }
        }
    }
}

#[async_trait]
impl EventSink for ConnectionManager {
    async fn emit(&self, session_id: &str, event: OutboundEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => self.broadcast(session_id, json).await,
            Err(e) => {
                tracing::error!(
                    session_id = %session_id,
                    "failed to serialize outbound event: {}",
                    e
                );
            }
        }
    }
}

/// Sends a JSON-serialized event directly to one connection's sender.
fn send_direct(tx: &mpsc::Sender<String>, event: &OutboundEvent) {
    match serde_json::to_string(event) {
        Ok(json) => {
            if let Err(e) = tx.try_send(json) {
                tracing::warn!("failed to send WebSocket event to client: {}", e);
            }
        }
        Err(e) => {
            tracing::error!("failed to serialize WebSocket event: {}", e);
        }
    }
}

/// WebSocket handler: `GET /ws`.
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handles one WebSocket connection for its lifetime.
///
/// Inbound messages are processed in arrival order, so within a session a
/// second utterance (or an end request) is handled only after the previous
/// turn completes.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Bounded channel per connection to prevent unbounded memory growth
    // from slow consumers; beyond 256 queued messages the client is too
    // slow and messages are dropped.
    let (tx, mut rx) = mpsc::channel::<String>(256);

    let connection_id = state.connections.add_connection(tx.clone()).await;
    tracing::info!(connection_id = %connection_id, "websocket client connected");

    // Forward queued messages to the socket.
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(AxumMessage::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    send_direct(
        &tx,
        &OutboundEvent::ConnectionResponse {
            status: "connected".to_string(),
        },
    );

    while let Some(Ok(msg)) = receiver.next().await {
        if let AxumMessage::Text(text) = msg {
            match serde_json::from_str::<IncomingMessage>(&text) {
                Ok(IncomingMessage::JoinVoiceSession { session_id }) => {
                    if session_id.is_empty() {
                        tracing::debug!("dropping join event with missing session id");
                        continue;
                    }
                    state.connections.join(&session_id, connection_id).await;
                    tracing::info!(
                        connection_id = %connection_id,
                        session_id = %session_id,
                        "client joined voice session"
                    );
                    state
                        .connections
                        .emit(
                            &session_id,
                            OutboundEvent::JoinedSession {
                                session_id: session_id.clone(),
                            },
                        )
                        .await;
                }
                Ok(IncomingMessage::UserAudio { session_id, text }) => {
                    state.pipeline.handle_utterance(&session_id, &text).await;
                }
                Ok(IncomingMessage::EndVoiceSession { session_id }) => {
                    state.pipeline.end_session(&session_id).await;
                    if !session_id.is_empty() {
                        state.connections.leave(&session_id, connection_id).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        connection_id = %connection_id,
                        "failed to parse incoming WebSocket message: {}",
                        e
                    );
                    send_direct(
                        &tx,
                        &OutboundEvent::Error {
                            message: "invalid message format".to_string(),
                        },
                    );
                }
            }
        } else if let AxumMessage::Close(_) = msg {
            break;
        }
    }

    state.connections.remove_connection(connection_id).await;
    send_task.abort();
    tracing::info!(connection_id = %connection_id, "websocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_only_room_members() {
        let manager = ConnectionManager::new();

        let (tx_a, mut rx_a) = mpsc::channel::<String>(8);
        let (tx_b, mut rx_b) = mpsc::channel::<String>(8);
        let conn_a = manager.add_connection(tx_a).await;
        let _conn_b = manager.add_connection(tx_b).await;

        manager.join("session-1", conn_a).await;
        manager.broadcast("session-1", "payload".to_string()).await;

        assert_eq!(rx_a.recv().await.as_deref(), Some("payload"));
        assert!(rx_b.try_recv().is_err(), "non-members receive nothing");
    }

    #[tokio::test]
    async fn removing_a_connection_cleans_up_its_rooms() {
        let manager = ConnectionManager::new();

        let (tx, mut rx) = mpsc::channel::<String>(8);
        let conn = manager.add_connection(tx).await;
        manager.join("session-1", conn).await;
        manager.remove_connection(conn).await;

        manager.broadcast("session-1", "payload".to_string()).await;
        assert!(rx.try_recv().is_err(), "removed connections receive nothing");
    }

    #[tokio::test]
    async fn emit_serializes_events_with_their_type_tag() {
        let manager = ConnectionManager::new();

        let (tx, mut rx) = mpsc::channel::<String>(8);
        let conn = manager.add_connection(tx).await;
        manager.join("session-1", conn).await;

        manager
            .emit(
                "session-1",
                OutboundEvent::Error {
                    message: "oops".to_string(),
                },
            )
            .await;

        let raw = rx.recv().await.expect("event delivered");
        let json: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "oops");
    }

    #[test]
    fn incoming_messages_parse_by_type_tag() {
        let join: IncomingMessage =
            serde_json::from_str(r#"{"type": "join_voice_session", "session_id": "s-1"}"#)
                .expect("parse join");
        assert!(matches!(join, IncomingMessage::JoinVoiceSession { session_id } if session_id == "s-1"));

        let audio: IncomingMessage = serde_json::from_str(
            r#"{"type": "user_audio", "session_id": "s-1", "text": "hello"}"#,
        )
        .expect("parse audio");
        assert!(matches!(audio, IncomingMessage::UserAudio { text, .. } if text == "hello"));

        // Missing fields default to empty; the pipeline drops them silently.
        let bare: IncomingMessage =
            serde_json::from_str(r#"{"type": "user_audio"}"#).expect("parse bare audio");
        assert!(
            matches!(bare, IncomingMessage::UserAudio { session_id, text } if session_id.is_empty() && text.is_empty())
        );
    }
}
