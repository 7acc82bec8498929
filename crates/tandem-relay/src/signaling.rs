//! Signaling relay: delivers server events to live connections.
//!
//! Point-to-point routing is keyed purely by connection id and never looks
//! inside the payload. Room-scoped broadcasts read the member list from the
//! registry at send time.

use std::collections::HashMap;
use std::sync::Arc;

use tandem_common::{ConnectionId, HandshakePayload, RelayError, ServerEvent};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::registry::SharedRegistry;

/// Outbound queue of one connection. Sends never wait: a connection whose
/// queue is full is evicted, which closes its session.
pub type Outbox = mpsc::Sender<ServerEvent>;

/// Result of offering one event to one outbox.
enum Delivery {
    Sent,
    Gone,
    Overflowed,
}

fn offer(outbox: &Outbox, event: ServerEvent) -> Delivery {
    match outbox.try_send(event) {
        Ok(()) => Delivery::Sent,
        Err(TrySendError::Closed(_)) => Delivery::Gone,
        Err(TrySendError::Full(_)) => Delivery::Overflowed,
    }
}

/// Which handshake step a payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeKind {
    Offer,
    Answer,
    IceCandidate,
}

impl HandshakeKind {
    pub fn into_event(self, payload: HandshakePayload) -> ServerEvent {
        match self {
            HandshakeKind::Offer => ServerEvent::Offer(payload),
            HandshakeKind::Answer => ServerEvent::Answer(payload),
            HandshakeKind::IceCandidate => ServerEvent::IceCandidate(payload),
        }
    }
}

#[derive(Clone)]
pub struct SignalingRelay {
    connections: Arc<RwLock<HashMap<ConnectionId, Outbox>>>,
    registry: SharedRegistry,
}

impl SignalingRelay {
    pub fn new(registry: SharedRegistry) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            registry,
        }
    }

    pub async fn register(&self, id: ConnectionId, outbox: Outbox) {
        self.connections.write().await.insert(id, outbox);
    }

    /// Forget a connection. Returns false if it was not registered.
    pub async fn unregister(&self, id: &ConnectionId) -> bool {
        self.connections.write().await.remove(id).is_some()
    }

    pub async fn is_connected(&self, id: &ConnectionId) -> bool {
        self.connections.read().await.contains_key(id)
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Deliver `event` to `target` as-is.
    ///
    /// A target that is gone yields `StaleTarget`; callers log it and move on.
    pub async fn route_to_connection(
        &self,
        target: &ConnectionId,
        event: ServerEvent,
    ) -> Result<(), RelayError> {
        let name = event.name();
        let delivery = match self.connections.read().await.get(target) {
            Some(outbox) => offer(outbox, event),
            None => Delivery::Gone,
        };
        match delivery {
            Delivery::Sent => Ok(()),
            Delivery::Gone => {
                debug!(target = %target, event = name, "Dropping event for stale target");
                Err(RelayError::StaleTarget(target.to_string()))
            }
            Delivery::Overflowed => {
                self.evict(std::slice::from_ref(target)).await;
                Err(RelayError::StaleTarget(target.to_string()))
            }
        }
    }

    /// Deliver `event` to every current member of `room_id`, optionally
    /// skipping one connection. Returns how many members received it.
    pub async fn broadcast_to_room(
        &self,
        room_id: &str,
        event: ServerEvent,
        exclude: Option<&ConnectionId>,
    ) -> usize {
        let members = self.registry.read().await.members_of(room_id);
        self.broadcast_to(&members, event, exclude).await
    }

    /// Deliver `event` to an explicit member list.
    pub async fn broadcast_to(
        &self,
        members: &[ConnectionId],
        event: ServerEvent,
        exclude: Option<&ConnectionId>,
    ) -> usize {
        let mut delivered = 0;
        let mut overflowed = Vec::new();
        {
            let connections = self.connections.read().await;
            for member in members {
                if exclude == Some(member) {
                    continue;
                }
                let delivery = match connections.get(member) {
                    Some(outbox) => offer(outbox, event.clone()),
                    None => Delivery::Gone,
                };
                match delivery {
                    Delivery::Sent => delivered += 1,
                    Delivery::Gone => {
                        debug!(target = %member, event = event.name(), "Broadcast skipped stale member")
                    }
                    Delivery::Overflowed => overflowed.push(member.clone()),
                }
            }
        }
        if !overflowed.is_empty() {
            self.evict(&overflowed).await;
        }
        delivered
    }

    /// Drop the outboxes of connections that stopped reading. With its only
    /// sender gone the session loop sees its queue close and shuts down.
    async fn evict(&self, ids: &[ConnectionId]) {
        let mut connections = self.connections.write().await;
        for id in ids {
            if connections.remove(id).is_some() {
                warn!(connection = %id, "Outbox full, disconnecting slow reader");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RoomRegistry;
    use tokio::sync::mpsc::Receiver;

    async fn connect(relay: &SignalingRelay, id: &str) -> (ConnectionId, Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let id = ConnectionId::from(id);
        relay.register(id.clone(), tx).await;
        (id, rx)
    }

    #[tokio::test]
    async fn routes_payload_verbatim() {
        let relay = SignalingRelay::new(RoomRegistry::shared());
        let (b, mut rx_b) = connect(&relay, "B").await;

        let payload = HandshakePayload::new(b.clone())
            .with("caller", "A")
            .with("sdp", "X");
        relay
            .route_to_connection(&b, HandshakeKind::Offer.into_event(payload.clone()))
            .await
            .unwrap();

        assert_eq!(rx_b.try_recv().unwrap(), ServerEvent::Offer(payload));
    }

    #[tokio::test]
    async fn unknown_target_is_stale() {
        let relay = SignalingRelay::new(RoomRegistry::shared());
        let err = relay
            .route_to_connection(&"ghost".into(), ServerEvent::RoomFull)
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::StaleTarget("ghost".into()));
    }

    #[tokio::test]
    async fn closed_receiver_is_stale() {
        let relay = SignalingRelay::new(RoomRegistry::shared());
        let (b, rx_b) = connect(&relay, "B").await;
        drop(rx_b);
        assert!(relay.route_to_connection(&b, ServerEvent::RoomFull).await.is_err());
    }

    #[tokio::test]
    async fn broadcast_respects_exclude() {
        let registry = RoomRegistry::shared();
        let relay = SignalingRelay::new(Arc::clone(&registry));
        let (a, mut rx_a) = connect(&relay, "A").await;
        let (b, mut rx_b) = connect(&relay, "B").await;
        {
            let mut reg = registry.write().await;
            reg.join("r1", &a).unwrap();
            reg.join("r1", &b).unwrap();
        }

        let ev = ServerEvent::DisplayTyping {
            sender_id: a.clone(),
        };
        assert_eq!(relay.broadcast_to_room("r1", ev.clone(), Some(&a)).await, 1);
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap(), ev);

        assert_eq!(relay.broadcast_to_room("r1", ServerEvent::RoomFull, None).await, 2);
        assert_eq!(rx_a.try_recv().unwrap(), ServerEvent::RoomFull);
        assert_eq!(rx_b.try_recv().unwrap(), ServerEvent::RoomFull);
    }

    #[tokio::test]
    async fn broadcast_to_empty_room_reaches_nobody() {
        let relay = SignalingRelay::new(RoomRegistry::shared());
        assert_eq!(relay.broadcast_to_room("void", ServerEvent::RoomFull, None).await, 0);
    }

    #[tokio::test]
    async fn unregister_reports_presence() {
        let relay = SignalingRelay::new(RoomRegistry::shared());
        let (a, _rx) = connect(&relay, "A").await;
        assert!(relay.is_connected(&a).await);
        assert_eq!(relay.connection_count().await, 1);
        assert!(relay.unregister(&a).await);
        assert!(!relay.unregister(&a).await);
        assert!(!relay.is_connected(&a).await);
    }

    #[tokio::test]
    async fn full_outbox_evicts_the_reader() {
        let registry = RoomRegistry::shared();
        let relay = SignalingRelay::new(Arc::clone(&registry));
        let (a, mut rx_a) = connect(&relay, "A").await;
        let (tx, mut rx_b) = mpsc::channel(1);
        let b = ConnectionId::from("B");
        relay.register(b.clone(), tx).await;
        {
            let mut reg = registry.write().await;
            reg.join("r1", &a).unwrap();
            reg.join("r1", &b).unwrap();
        }

        assert_eq!(relay.broadcast_to_room("r1", ServerEvent::RoomFull, None).await, 2);
        // B never drained its single slot.
        assert_eq!(relay.broadcast_to_room("r1", ServerEvent::RoomFull, None).await, 1);
        assert!(!relay.is_connected(&b).await);
        assert!(relay.is_connected(&a).await);

        assert_eq!(rx_b.recv().await, Some(ServerEvent::RoomFull));
        assert_eq!(rx_b.recv().await, None);
        assert_eq!(rx_a.try_recv().unwrap(), ServerEvent::RoomFull);
        assert_eq!(rx_a.try_recv().unwrap(), ServerEvent::RoomFull);
    }

    #[tokio::test]
    async fn routing_into_full_outbox_is_stale() {
        let relay = SignalingRelay::new(RoomRegistry::shared());
        let (tx, _rx) = mpsc::channel(1);
        let b = ConnectionId::from("B");
        relay.register(b.clone(), tx).await;

        relay.route_to_connection(&b, ServerEvent::RoomFull).await.unwrap();
        assert!(relay.route_to_connection(&b, ServerEvent::RoomFull).await.is_err());
        assert!(!relay.is_connected(&b).await);
    }
}
