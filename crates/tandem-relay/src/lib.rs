//! tandem-relay: rendezvous and chat relay for two-party rooms.
//!
//! Clients connect over WebSocket, join a room by id, and the relay pairs
//! the first two arrivals. It forwards the call handshake between them
//! without looking inside it, and persists every chat message before
//! fanning it out to the room.

pub mod connection;
pub mod coordinator;
pub mod registry;
pub mod server;
pub mod signaling;

pub use coordinator::{ChatSubmission, PendingChat, RoomCoordinator};
pub use registry::{JoinOutcome, RoomRegistry, RoomState, SharedRegistry, ROOM_CAPACITY};
pub use server::{serve, ServerContext};
pub use signaling::{HandshakeKind, Outbox, SignalingRelay};
