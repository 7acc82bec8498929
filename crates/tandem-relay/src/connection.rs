//! Per-connection handler: greet, then pump frames both ways until close.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tandem_common::{ClientEvent, ConnectionId, ServerEvent};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::coordinator::{ChatSubmission, PendingChat};
use crate::server::ServerContext;
use crate::signaling::HandshakeKind;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Store requests one connection may have waiting before new ones are refused.
const STORE_QUEUE_DEPTH: usize = 64;

/// How long a closed connection's queued store work may run before the
/// connection is dropped from its rooms regardless.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Work for a connection's store worker. Anything that waits on the store
/// goes here so the socket loop keeps relaying handshakes meanwhile.
#[derive(Debug)]
pub(crate) enum StoreJob {
    Chat(PendingChat),
    History { room_id: String, limit: Option<usize> },
}

/// Handle a single WebSocket connection.
///
/// The session runs in its own task so that room cleanup happens however
/// it ends, panics included. Store work still queued when the socket goes
/// gets up to [`DRAIN_TIMEOUT`] to finish before the connection is dropped
/// from its rooms.
pub async fn handle_connection(ws: WebSocketStream<TcpStream>, addr: SocketAddr, ctx: ServerContext) {
    let (tx, rx) = mpsc::channel::<ServerEvent>(ctx.outbox_capacity.max(1));
    let conn = ctx.coordinator.connect(tx).await;
    tracing::info!(peer = %addr, connection = %conn, "Client connected");

    let (jobs_tx, jobs_rx) = mpsc::channel::<StoreJob>(STORE_QUEUE_DEPTH);
    let mut worker = tokio::spawn(store_worker(ctx.clone(), conn.clone(), jobs_rx));

    let session = tokio::spawn(session_loop(ws, addr, conn.clone(), rx, jobs_tx, ctx.clone()));
    if let Err(e) = session.await {
        tracing::warn!(peer = %addr, connection = %conn, error = %e, "Session task aborted");
    }
    match tokio::time::timeout(DRAIN_TIMEOUT, &mut worker).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(peer = %addr, connection = %conn, error = %e, "Store worker aborted");
        }
        Err(_) => {
            tracing::warn!(peer = %addr, connection = %conn, "Store work still pending, abandoning it");
            worker.abort();
        }
    }

    ctx.coordinator.disconnect(&conn).await;
    tracing::info!(peer = %addr, connection = %conn, "Client disconnected");
}

async fn session_loop(
    ws: WebSocketStream<TcpStream>,
    addr: SocketAddr,
    conn: ConnectionId,
    mut rx: mpsc::Receiver<ServerEvent>,
    jobs: mpsc::Sender<StoreJob>,
    ctx: ServerContext,
) {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            outgoing = rx.recv() => {
                let Some(event) = outgoing else {
                    // Evicted by the relay: the outbox overflowed.
                    tracing::info!(peer = %addr, connection = %conn, "Outbox closed, dropping client");
                    break;
                };
                let backlog = rx.len();
                if backlog >= ctx.outbox_warn_depth {
                    tracing::warn!(connection = %conn, backlog, "Outbox backing up");
                }
                if send_event(&mut sink, &event).await.is_err() {
                    break;
                }
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(text.as_str()) {
                            Ok(event) => dispatch(&ctx, &conn, &jobs, event).await,
                            Err(e) => {
                                tracing::debug!(connection = %conn, error = %e, "Unparseable frame");
                                reply(&ctx, &conn, ServerEvent::Error {
                                    message: format!("malformed event: {e}"),
                                })
                                .await;
                            }
                        }
                    }
                    // Pings are answered by tungstenite itself.
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // Best effort: flush whatever is already queued before the socket goes.
    while let Ok(event) = rx.try_recv() {
        if send_event(&mut sink, &event).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}

/// Run store jobs for one connection, in the order they were received,
/// until the session drops its end of the queue.
async fn store_worker(ctx: ServerContext, conn: ConnectionId, mut jobs: mpsc::Receiver<StoreJob>) {
    while let Some(job) = jobs.recv().await {
        run_job(&ctx, &conn, job).await;
    }
}

async fn run_job(ctx: &ServerContext, conn: &ConnectionId, job: StoreJob) {
    match job {
        StoreJob::Chat(pending) => {
            // Failures are reported to the sender by the coordinator.
            let _ = ctx.coordinator.deliver_chat(pending).await;
        }
        StoreJob::History { room_id, limit } => serve_history(ctx, conn, room_id, limit).await,
    }
}

/// Route one client event to whoever handles it. Never waits on the store.
pub(crate) async fn dispatch(
    ctx: &ServerContext,
    conn: &ConnectionId,
    jobs: &mpsc::Sender<StoreJob>,
    event: ClientEvent,
) {
    let coordinator = &ctx.coordinator;
    match event {
        ClientEvent::JoinRoom { room_id } => {
            // Refusals are reported to the client by the coordinator.
            let _ = coordinator.join(conn, &room_id).await;
        }
        ClientEvent::LeaveRoom { room_id } => coordinator.leave(conn, &room_id).await,
        ClientEvent::Offer(payload) => {
            coordinator
                .relay_handshake(conn, HandshakeKind::Offer, payload)
                .await
        }
        ClientEvent::Answer(payload) => {
            coordinator
                .relay_handshake(conn, HandshakeKind::Answer, payload)
                .await
        }
        ClientEvent::IceCandidate(payload) => {
            coordinator
                .relay_handshake(conn, HandshakeKind::IceCandidate, payload)
                .await
        }
        ClientEvent::SendMessage {
            room_id,
            sender_id,
            text,
            kind,
            client_temp_id,
        } => {
            let submission = ChatSubmission {
                room_id,
                sender_id,
                text,
                kind,
                client_temp_id,
            };
            let Ok(pending) = coordinator.admit_chat(conn, submission).await else {
                return;
            };
            if let Err(e) = jobs.try_send(StoreJob::Chat(pending)) {
                if let StoreJob::Chat(pending) = e.into_inner() {
                    tracing::warn!(connection = %conn, room = %pending.room_id(), "Store queue full, message refused");
                    coordinator.refuse_chat(pending).await;
                }
            }
        }
        ClientEvent::TypingStart { room_id } => coordinator.typing(conn, &room_id, true).await,
        ClientEvent::TypingStop { room_id } => coordinator.typing(conn, &room_id, false).await,
        ClientEvent::FetchHistory { room_id, limit } => {
            if jobs.try_send(StoreJob::History { room_id, limit }).is_err() {
                tracing::warn!(connection = %conn, "Store queue full, history refused");
                reply(ctx, conn, ServerEvent::Error {
                    message: "too many pending requests".into(),
                })
                .await;
            }
        }
    }
}

/// History is read straight from the store; room membership is not required.
async fn serve_history(ctx: &ServerContext, conn: &ConnectionId, room_id: String, limit: Option<usize>) {
    if let Err(e) = ctx.coordinator.check_room_id(&room_id) {
        reply(ctx, conn, ServerEvent::Error { message: e.to_string() }).await;
        return;
    }
    let limit = ctx.chat.clamp_history(limit);
    let event = match ctx.store().recent(&room_id, limit).await {
        Ok(messages) => {
            tracing::debug!(connection = %conn, room = %room_id, count = messages.len(), "History served");
            ServerEvent::ChatHistory { room_id, messages }
        }
        Err(e) => {
            tracing::warn!(connection = %conn, room = %room_id, error = %e, "History read failed");
            ServerEvent::Error {
                message: format!("history unavailable: {e}"),
            }
        }
    };
    reply(ctx, conn, event).await;
}

/// Queue an event on this connection's own outbox so it stays in order with
/// everything else it is sent.
async fn reply(ctx: &ServerContext, conn: &ConnectionId, event: ServerEvent) {
    let _ = ctx.coordinator.relay().route_to_connection(conn, event).await;
}

async fn send_event(
    sink: &mut WsSink,
    event: &ServerEvent,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(event = event.name(), error = %e, "Failed to encode event");
            return Ok(());
        }
    };
    sink.send(Message::Text(json.into())).await
}
