//! Room coordinator: the per-room protocol state machine.
//!
//! Rooms move `Empty -> Waiting -> Paired` as members arrive and fall back
//! as they leave. The coordinator decides who initiates the handshake,
//! refuses a third member, forwards handshake payloads, and runs every chat
//! message through the store before anyone sees it.

use std::sync::Arc;

use regex::Regex;
use tandem_common::{
    ChatMessage, ConnectionId, HandshakePayload, MessageKind, NewMessage, RoomError, ServerEvent,
};
use tandem_store::MessageStore;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::registry::{JoinOutcome, RoomRegistry, SharedRegistry};
use crate::signaling::{HandshakeKind, Outbox, SignalingRelay};


/// A chat message as it arrives from a client.
#[derive(Debug, Clone)]
pub struct ChatSubmission {
    pub room_id: String,
    pub sender_id: String,
    pub text: String,
    pub kind: MessageKind,
    pub client_temp_id: Option<String>,
}

/// A chat message from a room member, waiting for the store.
#[derive(Debug)]
pub struct PendingChat {
    sender: ConnectionId,
    lane: Arc<Mutex<()>>,
    submission: ChatSubmission,
}

impl PendingChat {
    pub fn room_id(&self) -> &str {
        &self.submission.room_id
    }
}

#[derive(Clone)]
pub struct RoomCoordinator {
    registry: SharedRegistry,
    relay: SignalingRelay,
    store: Arc<dyn MessageStore>,
    room_pattern: Regex,
}

impl RoomCoordinator {
    pub fn new(store: Arc<dyn MessageStore>, room_pattern: Regex) -> Self {
        let registry = RoomRegistry::shared();
        let relay = SignalingRelay::new(Arc::clone(&registry));
        Self {
            registry,
            relay,
            store,
            room_pattern,
        }
    }

    pub fn relay(&self) -> &SignalingRelay {
        &self.relay
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    pub fn check_room_id(&self, room_id: &str) -> Result<(), RoomError> {
        if self.room_pattern.is_match(room_id) {
            Ok(())
        } else {
            Err(RoomError::InvalidRoomId(room_id.to_string()))
        }
    }

    /// Admit a new connection: allocate its id, register its outbox and
    /// tell it who it is.
    pub async fn connect(&self, outbox: Outbox) -> ConnectionId {
        let id = ConnectionId::new();
        self.relay.register(id.clone(), outbox).await;
        self.notify(
            &id,
            ServerEvent::Connected {
                connection_id: id.clone(),
            },
        )
        .await;
        id
    }

    /// Put `conn` into `room_id`.
    ///
    /// The second arrival triggers `user_joined` to the member already
    /// waiting, and only to them. A refused join is answered with
    /// `room_full` (or `error` for a malformed id) to the caller alone.
    pub async fn join(&self, conn: &ConnectionId, room_id: &str) -> Result<JoinOutcome, RoomError> {
        if let Err(e) = self.check_room_id(room_id) {
            self.notify(conn, ServerEvent::Error { message: e.to_string() })
                .await;
            return Err(e);
        }

        let mut registry = self.registry.write().await;
        let outcome = match registry.join(room_id, conn) {
            Ok(outcome) => outcome,
            Err(e) => {
                drop(registry);
                info!(connection = %conn, room = %room_id, "Join refused, room full");
                self.notify(conn, ServerEvent::RoomFull).await;
                return Err(e);
            }
        };

        match &outcome {
            JoinOutcome::Waiting => {
                info!(connection = %conn, room = %room_id, "Joined room, waiting for partner");
            }
            JoinOutcome::Paired { initiator } => {
                info!(connection = %conn, room = %room_id, initiator = %initiator, "Joined room, paired");
                // Still under the registry lock: the initiator cannot have
                // left between pairing and this notice.
                self.notify(
                    initiator,
                    ServerEvent::UserJoined {
                        connection_id: conn.clone(),
                    },
                )
                .await;
            }
            JoinOutcome::AlreadyMember => {
                debug!(connection = %conn, room = %room_id, "Duplicate join ignored");
            }
        }
        Ok(outcome)
    }

    /// Take `conn` out of `room_id` and tell whoever is left.
    pub async fn leave(&self, conn: &ConnectionId, room_id: &str) {
        let departure = self.registry.write().await.leave(room_id, conn);
        match departure {
            Some(dep) => {
                info!(connection = %conn, room = %room_id, remaining = dep.remaining.len(), "Left room");
                self.announce_departure(conn, &dep.remaining).await;
            }
            None => debug!(connection = %conn, room = %room_id, "Leave for non-member ignored"),
        }
    }

    /// Cleanup for a closed connection. Safe to call more than once.
    pub async fn disconnect(&self, conn: &ConnectionId) {
        let departures = self.registry.write().await.leave_all(conn);
        self.relay.unregister(conn).await;
        for dep in &departures {
            info!(connection = %conn, room = %dep.room_id, remaining = dep.remaining.len(), "Disconnected from room");
            self.announce_departure(conn, &dep.remaining).await;
        }
    }

    /// Forward an offer, answer or ICE candidate to its target untouched.
    pub async fn relay_handshake(
        &self,
        from: &ConnectionId,
        kind: HandshakeKind,
        payload: HandshakePayload,
    ) {
        let target = payload.target.clone();
        match self.relay.route_to_connection(&target, kind.into_event(payload)).await {
            Ok(()) => debug!(from = %from, target = %target, kind = ?kind, "Handshake relayed"),
            Err(e) => debug!(from = %from, kind = ?kind, error = %e, "Handshake dropped"),
        }
    }

    /// Persist a chat message, then broadcast it to the whole room,
    /// sender included.
    ///
    /// Nothing is broadcast unless the store accepted the message; the
    /// sender alone gets `message_failed` instead.
    pub async fn send_chat(
        &self,
        conn: &ConnectionId,
        submission: ChatSubmission,
    ) -> tandem_common::Result<ChatMessage> {
        let pending = self.admit_chat(conn, submission).await?;
        self.deliver_chat(pending).await
    }

    /// First half of [`send_chat`](Self::send_chat): check membership as of
    /// now. A message admitted here is delivered even if its sender leaves
    /// before the store answers.
    pub async fn admit_chat(
        &self,
        conn: &ConnectionId,
        submission: ChatSubmission,
    ) -> Result<PendingChat, RoomError> {
        let lane = self.registry.read().await.chat_lane(&submission.room_id, conn);
        match lane {
            Ok(lane) => Ok(PendingChat {
                sender: conn.clone(),
                lane,
                submission,
            }),
            Err(e) => {
                warn!(connection = %conn, error = %e, "Chat from non-member dropped");
                Err(e)
            }
        }
    }

    /// Second half of [`send_chat`](Self::send_chat): persist under the
    /// room's chat lane, then broadcast.
    pub async fn deliver_chat(&self, pending: PendingChat) -> tandem_common::Result<ChatMessage> {
        let PendingChat {
            sender,
            lane,
            submission,
        } = pending;
        let room_id = submission.room_id;

        let _turn = lane.lock().await;
        let draft = NewMessage {
            room_id: room_id.clone(),
            sender_id: submission.sender_id,
            text: submission.text,
            kind: submission.kind,
        };
        match self.store.append(draft).await {
            Ok(msg) => {
                let delivered = self
                    .relay
                    .broadcast_to_room(&room_id, ServerEvent::ReceiveMessage(msg.clone()), None)
                    .await;
                debug!(room = %room_id, id = %msg.id, delivered, "Chat message broadcast");
                Ok(msg)
            }
            Err(e) => {
                warn!(connection = %sender, room = %room_id, error = %e, "Chat message not persisted");
                self.notify(
                    &sender,
                    ServerEvent::MessageFailed {
                        room_id,
                        client_temp_id: submission.client_temp_id,
                    },
                )
                .await;
                Err(e.into())
            }
        }
    }

    /// Tell the sender its message was never attempted.
    pub async fn refuse_chat(&self, pending: PendingChat) {
        self.notify(
            &pending.sender,
            ServerEvent::MessageFailed {
                room_id: pending.submission.room_id,
                client_temp_id: pending.submission.client_temp_id,
            },
        )
        .await;
    }

    /// Relay a typing start/stop to the other member. Nothing is retained.
    pub async fn typing(&self, conn: &ConnectionId, room_id: &str, typing: bool) {
        if !self.registry.read().await.is_member(room_id, conn) {
            debug!(connection = %conn, room = %room_id, "Typing from non-member dropped");
            return;
        }
        let sender_id = conn.clone();
        let event = if typing {
            ServerEvent::DisplayTyping { sender_id }
        } else {
            ServerEvent::HideTyping { sender_id }
        };
        self.relay.broadcast_to_room(room_id, event, Some(conn)).await;
    }

    async fn announce_departure(&self, departed: &ConnectionId, remaining: &[ConnectionId]) {
        if remaining.is_empty() {
            return;
        }
        self.relay
            .broadcast_to(
                remaining,
                ServerEvent::HideTyping {
                    sender_id: departed.clone(),
                },
                None,
            )
            .await;
        self.relay
            .broadcast_to(
                remaining,
                ServerEvent::PeerLeft {
                    connection_id: departed.clone(),
                },
                None,
            )
            .await;
    }

    /// Best-effort delivery to one connection.
    async fn notify(&self, target: &ConnectionId, event: ServerEvent) {
        if let Err(e) = self.relay.route_to_connection(target, event).await {
            debug!(error = %e, "Notification dropped");
        }
    }
}
