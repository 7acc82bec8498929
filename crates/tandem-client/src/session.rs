//! A single room session over one WebSocket connection.
//!
//! Opening a session connects, learns the connection id the relay assigned,
//! joins the room and asks for recent history. Everything the relay sends
//! afterwards comes out of the returned receiver as a [`SessionEvent`].
//! Leaving (or dropping the session) sends `leave_room` and closes the
//! socket.

use std::time::Duration;

use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tandem_common::{
    new_id, ChatMessage, ClientEvent, ConnectionId, HandshakePayload, MessageKind, RoomId,
    ServerEvent,
};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::ClientError;


type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const GREETING_TIMEOUT: Duration = Duration::from_secs(10);

/// What the relay told this session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The room already had two members. The session is not in the room.
    RoomFull,
    /// A second member arrived; this session initiates the call.
    PeerJoined(ConnectionId),
    Offer(HandshakePayload),
    Answer(HandshakePayload),
    IceCandidate(HandshakePayload),
    Message(ChatMessage),
    /// The relay could not persist a message this session sent.
    MessageFailed { client_temp_id: Option<String> },
    PeerTyping(ConnectionId),
    PeerStoppedTyping(ConnectionId),
    PeerLeft(ConnectionId),
    History(Vec<ChatMessage>),
    ServerError(String),
    /// The socket is gone. No further events follow.
    Closed,
}

impl SessionEvent {
    fn from_server(event: ServerEvent) -> Option<Self> {
        Some(match event {
            ServerEvent::Connected { .. } => return None,
            ServerEvent::RoomFull => Self::RoomFull,
            ServerEvent::UserJoined { connection_id } => Self::PeerJoined(connection_id),
            ServerEvent::Offer(p) => Self::Offer(p),
            ServerEvent::Answer(p) => Self::Answer(p),
            ServerEvent::IceCandidate(p) => Self::IceCandidate(p),
            ServerEvent::ReceiveMessage(m) => Self::Message(m),
            ServerEvent::MessageFailed { client_temp_id, .. } => Self::MessageFailed { client_temp_id },
            ServerEvent::DisplayTyping { sender_id } => Self::PeerTyping(sender_id),
            ServerEvent::HideTyping { sender_id } => Self::PeerStoppedTyping(sender_id),
            ServerEvent::PeerLeft { connection_id } => Self::PeerLeft(connection_id),
            ServerEvent::ChatHistory { messages, .. } => Self::History(messages),
            ServerEvent::Error { message } => Self::ServerError(message),
        })
    }
}

pub struct RoomSession {
    connection_id: ConnectionId,
    room_id: RoomId,
    sender_id: String,
    outgoing: Option<mpsc::UnboundedSender<ClientEvent>>,
    pump: Option<JoinHandle<()>>,
}

impl RoomSession {
    /// Connect to the relay at `url` and join `room_id`.
    ///
    /// `history_limit` is passed through to the history request; `None`
    /// lets the relay pick its default.
    pub async fn open(
        url: &str,
        room_id: &str,
        history_limit: Option<usize>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), ClientError> {
        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| ClientError::Connect(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        let connection_id = read_greeting(&mut stream).await?;
        tracing::info!(connection = %connection_id, room = %room_id, "Connected to relay");

        for event in [
            ClientEvent::JoinRoom {
                room_id: room_id.to_string(),
            },
            ClientEvent::FetchHistory {
                room_id: room_id.to_string(),
                limit: history_limit,
            },
        ] {
            let json = encode(&event)?;
            sink.send(Message::Text(json.into()))
                .await
                .map_err(|e| ClientError::Connect(e.to_string()))?;
        }

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<SessionEvent>();

        let conn = connection_id.clone();
        let pump = tokio::spawn(async move {
            loop {
                tokio::select! {
                    outgoing = out_rx.recv() => {
                        let Some(event) = outgoing else {
                            // Session dropped or left.
                            let _ = sink.close().await;
                            break;
                        };
                        let json = match encode(&event) {
                            Ok(json) => json,
                            Err(e) => {
                                tracing::warn!(error = %e, "Dropping unencodable event");
                                continue;
                            }
                        };
                        if sink.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }

                    frame = stream.next() => {
                        match frame {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<ServerEvent>(text.as_str()) {
                                    Ok(event) => {
                                        if let Some(event) = SessionEvent::from_server(event) {
                                            let _ = event_tx.send(event);
                                        }
                                    }
                                    Err(e) => {
                                        tracing::debug!(connection = %conn, error = %e, "Unparseable relay frame");
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Err(e)) => {
                                tracing::debug!(connection = %conn, error = %e, "WS error");
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }
            tracing::info!(connection = %conn, "Relay session closed");
            let _ = event_tx.send(SessionEvent::Closed);
        });

        let session = Self {
            sender_id: connection_id.to_string(),
            connection_id,
            room_id: room_id.to_string(),
            outgoing: Some(out_tx),
            pump: Some(pump),
        };
        Ok((session, event_rx))
    }

    /// Use `sender_id` as the logical author of chat messages. Defaults to
    /// the connection id.
    pub fn with_sender_id(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = sender_id.into();
        self
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    /// Send a text message. Returns the temp id echoed back on failure.
    pub fn send_text(&self, text: &str) -> Result<String, ClientError> {
        self.send_chat(text, MessageKind::Text)
    }

    pub fn send_emoji(&self, emoji: &str) -> Result<String, ClientError> {
        self.send_chat(emoji, MessageKind::Emoji)
    }

    fn send_chat(&self, text: &str, kind: MessageKind) -> Result<String, ClientError> {
        let temp_id = new_id();
        self.send(ClientEvent::SendMessage {
            room_id: self.room_id.clone(),
            sender_id: self.sender_id.clone(),
            text: text.to_string(),
            kind,
            client_temp_id: Some(temp_id.clone()),
        })?;
        Ok(temp_id)
    }

    pub fn typing_start(&self) -> Result<(), ClientError> {
        self.send(ClientEvent::TypingStart {
            room_id: self.room_id.clone(),
        })
    }

    pub fn typing_stop(&self) -> Result<(), ClientError> {
        self.send(ClientEvent::TypingStop {
            room_id: self.room_id.clone(),
        })
    }

    /// Offer a session description to `target`, signed with our own id as
    /// `caller` so the answer can find its way back.
    pub fn send_offer(&self, target: &ConnectionId, sdp: impl Into<Value>) -> Result<(), ClientError> {
        let payload = HandshakePayload::new(target.clone())
            .with("caller", self.connection_id.as_str())
            .with("sdp", sdp);
        self.send(ClientEvent::Offer(payload))
    }

    pub fn send_answer(&self, target: &ConnectionId, sdp: impl Into<Value>) -> Result<(), ClientError> {
        let payload = HandshakePayload::new(target.clone()).with("sdp", sdp);
        self.send(ClientEvent::Answer(payload))
    }

    pub fn send_ice_candidate(
        &self,
        target: &ConnectionId,
        candidate: impl Into<Value>,
    ) -> Result<(), ClientError> {
        let payload = HandshakePayload::new(target.clone()).with("candidate", candidate);
        self.send(ClientEvent::IceCandidate(payload))
    }

    pub fn fetch_history(&self, limit: Option<usize>) -> Result<(), ClientError> {
        self.send(ClientEvent::FetchHistory {
            room_id: self.room_id.clone(),
            limit,
        })
    }

    /// Leave the room and close the connection.
    pub async fn leave(mut self) {
        if let Some(outgoing) = self.outgoing.take() {
            let _ = outgoing.send(ClientEvent::LeaveRoom {
                room_id: self.room_id.clone(),
            });
        }
        if let Some(pump) = self.pump.take() {
            let _ = pump.await;
        }
    }

    fn send(&self, event: ClientEvent) -> Result<(), ClientError> {
        let outgoing = self.outgoing.as_ref().ok_or(ClientError::Closed)?;
        outgoing.send(event).map_err(|_| ClientError::Closed)
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        // The pump sends this, then closes once the channel is dropped.
        if let Some(outgoing) = self.outgoing.take() {
            let _ = outgoing.send(ClientEvent::LeaveRoom {
                room_id: self.room_id.clone(),
            });
        }
    }
}

async fn read_greeting(stream: &mut SplitStream<WsStream>) -> Result<ConnectionId, ClientError> {
    let frame = tokio::time::timeout(GREETING_TIMEOUT, stream.next())
        .await
        .map_err(|_| ClientError::Protocol("no greeting from relay".into()))?;
    match frame {
        Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerEvent>(text.as_str()) {
            Ok(ServerEvent::Connected { connection_id }) => Ok(connection_id),
            Ok(other) => Err(ClientError::Protocol(format!(
                "expected connected, got {}",
                other.name()
            ))),
            Err(e) => Err(ClientError::Protocol(e.to_string())),
        },
        Some(Ok(_)) => Err(ClientError::Protocol("expected text greeting".into())),
        Some(Err(e)) => Err(ClientError::Connect(e.to_string())),
        None => Err(ClientError::Closed),
    }
}

fn encode(event: &ClientEvent) -> Result<String, ClientError> {
    serde_json::to_string(event).map_err(|e| ClientError::Protocol(e.to_string()))
}
