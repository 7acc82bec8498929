//! Room registry: maps room ids to their live members.
//!
//! A room is nothing more than its membership set. The entry appears on the
//! first join and is dropped the moment the last member leaves, so the
//! table never holds empty rooms.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tandem_common::{ConnectionId, RoomError, RoomId};
use tokio::sync::{Mutex, RwLock};

/// Members a room can hold.
pub const ROOM_CAPACITY: usize = 2;

pub type SharedRegistry = Arc<RwLock<RoomRegistry>>;

/// Observable lifecycle of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Empty,
    Waiting,
    Paired,
}

/// What a successful join changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// First member in; nobody to notify.
    Waiting,
    /// Second member in. `initiator` was already waiting and must be told.
    Paired { initiator: ConnectionId },
    /// The connection was already a member. Nothing changed.
    AlreadyMember,
}

/// A connection left `room_id`; `remaining` are the members still inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room_id: RoomId,
    pub remaining: Vec<ConnectionId>,
}

struct RoomEntry {
    /// Join order, at most `ROOM_CAPACITY`.
    members: Vec<ConnectionId>,
    initiator: Option<ConnectionId>,
    /// Serializes persist-then-broadcast for this room's chat.
    chat_lane: Arc<Mutex<()>>,
}

impl RoomEntry {
    fn new() -> Self {
        Self {
            members: Vec::with_capacity(ROOM_CAPACITY),
            initiator: None,
            chat_lane: Arc::new(Mutex::new(())),
        }
    }
}

#[derive(Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, RoomEntry>,
    /// Reverse index for disconnect cleanup.
    memberships: HashMap<ConnectionId, BTreeSet<RoomId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Add `conn` to `room_id`.
    ///
    /// A full room is refused before anything is touched, so existing
    /// members are never displaced. Joining twice is a no-op.
    pub fn join(&mut self, room_id: &str, conn: &ConnectionId) -> Result<JoinOutcome, RoomError> {
        if let Some(entry) = self.rooms.get(room_id) {
            if entry.members.contains(conn) {
                return Ok(JoinOutcome::AlreadyMember);
            }
            if entry.members.len() >= ROOM_CAPACITY {
                return Err(RoomError::RoomFull(room_id.to_string()));
            }
        }

        let entry = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(RoomEntry::new);
        entry.members.push(conn.clone());
        self.memberships
            .entry(conn.clone())
            .or_default()
            .insert(room_id.to_string());

        if entry.members.len() == ROOM_CAPACITY {
            let initiator = entry.members[0].clone();
            entry.initiator = Some(initiator.clone());
            Ok(JoinOutcome::Paired { initiator })
        } else {
            Ok(JoinOutcome::Waiting)
        }
    }

    /// Remove `conn` from `room_id`. Returns `None` if it was not a member.
    pub fn leave(&mut self, room_id: &str, conn: &ConnectionId) -> Option<Departure> {
        let entry = self.rooms.get_mut(room_id)?;
        let pos = entry.members.iter().position(|m| m == conn)?;
        entry.members.remove(pos);
        // Back to waiting: whoever pairs next re-runs the handshake.
        entry.initiator = None;
        let remaining = entry.members.clone();
        if remaining.is_empty() {
            self.rooms.remove(room_id);
        }

        if let Some(rooms) = self.memberships.get_mut(conn) {
            rooms.remove(room_id);
            if rooms.is_empty() {
                self.memberships.remove(conn);
            }
        }

        Some(Departure {
            room_id: room_id.to_string(),
            remaining,
        })
    }

    /// Remove `conn` from every room it belongs to.
    pub fn leave_all(&mut self, conn: &ConnectionId) -> Vec<Departure> {
        let rooms = self.rooms_of(conn);
        rooms
            .iter()
            .filter_map(|room_id| self.leave(room_id, conn))
            .collect()
    }

    /// Snapshot of a room's members in join order.
    pub fn members_of(&self, room_id: &str) -> Vec<ConnectionId> {
        self.rooms
            .get(room_id)
            .map(|e| e.members.clone())
            .unwrap_or_default()
    }

    pub fn is_member(&self, room_id: &str, conn: &ConnectionId) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|e| e.members.contains(conn))
    }

    pub fn initiator_of(&self, room_id: &str) -> Option<ConnectionId> {
        self.rooms.get(room_id).and_then(|e| e.initiator.clone())
    }

    pub fn rooms_of(&self, conn: &ConnectionId) -> Vec<RoomId> {
        self.memberships
            .get(conn)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn state_of(&self, room_id: &str) -> RoomState {
        match self.rooms.get(room_id).map(|e| e.members.len()) {
            None | Some(0) => RoomState::Empty,
            Some(n) if n < ROOM_CAPACITY => RoomState::Waiting,
            Some(_) => RoomState::Paired,
        }
    }

    /// The room's chat lane, available only to its members.
    pub fn chat_lane(&self, room_id: &str, conn: &ConnectionId) -> Result<Arc<Mutex<()>>, RoomError> {
        match self.rooms.get(room_id) {
            Some(entry) if entry.members.contains(conn) => Ok(Arc::clone(&entry.chat_lane)),
            _ => Err(RoomError::NotAMember {
                room: room_id.to_string(),
                connection: conn.to_string(),
            }),
        }
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (ConnectionId, ConnectionId, ConnectionId) {
        ("A".into(), "B".into(), "C".into())
    }

    #[test]
    fn first_join_waits() {
        let (a, _, _) = ids();
        let mut reg = RoomRegistry::new();
        assert_eq!(reg.join("r1", &a), Ok(JoinOutcome::Waiting));
        assert_eq!(reg.state_of("r1"), RoomState::Waiting);
        assert_eq!(reg.initiator_of("r1"), None);
    }

    #[test]
    fn second_join_pairs_with_first_as_initiator() {
        let (a, b, _) = ids();
        let mut reg = RoomRegistry::new();
        reg.join("r1", &a).unwrap();
        assert_eq!(
            reg.join("r1", &b),
            Ok(JoinOutcome::Paired {
                initiator: a.clone()
            })
        );
        assert_eq!(reg.state_of("r1"), RoomState::Paired);
        assert_eq!(reg.initiator_of("r1"), Some(a.clone()));
        assert_eq!(reg.members_of("r1"), vec![a, b]);
    }

    #[test]
    fn third_join_is_refused_without_displacing() {
        let (a, b, c) = ids();
        let mut reg = RoomRegistry::new();
        reg.join("r1", &a).unwrap();
        reg.join("r1", &b).unwrap();
        assert_eq!(reg.join("r1", &c), Err(RoomError::RoomFull("r1".into())));
        assert_eq!(reg.members_of("r1"), vec![a, b]);
        assert!(reg.rooms_of(&c).is_empty());
    }

    #[test]
    fn duplicate_join_is_noop() {
        let (a, b, _) = ids();
        let mut reg = RoomRegistry::new();
        reg.join("r1", &a).unwrap();
        assert_eq!(reg.join("r1", &a), Ok(JoinOutcome::AlreadyMember));
        assert_eq!(reg.members_of("r1").len(), 1);

        reg.join("r1", &b).unwrap();
        // A member of a full room re-joining is not "room full"
        assert_eq!(reg.join("r1", &b), Ok(JoinOutcome::AlreadyMember));
    }

    #[test]
    fn last_leave_discards_room() {
        let (a, _, _) = ids();
        let mut reg = RoomRegistry::new();
        reg.join("r1", &a).unwrap();
        let dep = reg.leave("r1", &a).unwrap();
        assert!(dep.remaining.is_empty());
        assert_eq!(reg.state_of("r1"), RoomState::Empty);
        assert_eq!(reg.room_count(), 0);
        assert!(reg.rooms_of(&a).is_empty());
    }

    #[test]
    fn vacated_room_rejoins_as_new() {
        let (a, b, c) = ids();
        let mut reg = RoomRegistry::new();
        reg.join("r1", &a).unwrap();
        reg.leave("r1", &a);
        assert_eq!(reg.join("r1", &b), Ok(JoinOutcome::Waiting));
        assert_eq!(
            reg.join("r1", &c),
            Ok(JoinOutcome::Paired { initiator: b })
        );
    }

    #[test]
    fn leave_from_pair_returns_to_waiting() {
        let (a, b, c) = ids();
        let mut reg = RoomRegistry::new();
        reg.join("r1", &a).unwrap();
        reg.join("r1", &b).unwrap();

        let dep = reg.leave("r1", &a).unwrap();
        assert_eq!(dep.remaining, vec![b.clone()]);
        assert_eq!(reg.state_of("r1"), RoomState::Waiting);
        assert_eq!(reg.initiator_of("r1"), None);

        // The one left behind initiates with the next arrival.
        assert_eq!(
            reg.join("r1", &c),
            Ok(JoinOutcome::Paired { initiator: b })
        );
    }

    #[test]
    fn leave_by_stranger_is_noop() {
        let (a, _, c) = ids();
        let mut reg = RoomRegistry::new();
        reg.join("r1", &a).unwrap();
        assert_eq!(reg.leave("r1", &c), None);
        assert_eq!(reg.leave("nowhere", &c), None);
        assert_eq!(reg.members_of("r1"), vec![a]);
    }

    #[test]
    fn leave_all_covers_every_room() {
        let (a, b, _) = ids();
        let mut reg = RoomRegistry::new();
        reg.join("r1", &a).unwrap();
        reg.join("r2", &a).unwrap();
        reg.join("r2", &b).unwrap();

        let mut departures = reg.leave_all(&a);
        departures.sort_by(|x, y| x.room_id.cmp(&y.room_id));
        assert_eq!(departures.len(), 2);
        assert!(departures[0].remaining.is_empty());
        assert_eq!(departures[1].remaining, vec![b]);
        assert_eq!(reg.room_count(), 1);
        assert!(reg.leave_all(&a).is_empty());
    }

    #[test]
    fn chat_lane_requires_membership() {
        let (a, b, c) = ids();
        let mut reg = RoomRegistry::new();
        reg.join("r1", &a).unwrap();
        reg.join("r1", &b).unwrap();

        let la = reg.chat_lane("r1", &a).unwrap();
        let lb = reg.chat_lane("r1", &b).unwrap();
        assert!(Arc::ptr_eq(&la, &lb));
        assert!(matches!(
            reg.chat_lane("r1", &c),
            Err(RoomError::NotAMember { .. })
        ));
        assert!(reg.chat_lane("r9", &a).is_err());
    }
}
