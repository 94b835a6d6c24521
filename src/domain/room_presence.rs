//! Which identities are online in which rooms on this hub instance.
//!
//! Presence is purely in-memory and independent of durable membership:
//! an identity can be a durable member of a room without being present.

use std::collections::{BTreeSet, HashMap};

use super::{RoomId, UserId};

/// Room → identities currently present.
///
/// Member sets are ordered so snapshots sent to clients are deterministic.
/// A room key exists iff at least one identity is present.
#[derive(Debug, Default)]
pub struct RoomPresence {
    rooms: HashMap<RoomId, BTreeSet<UserId>>,
}

impl RoomPresence {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an identity present in a room. Returns `false` if it already was.
    pub fn join(&mut self, room_id: &RoomId, user_id: &UserId) -> bool {
        self.rooms
            .entry(room_id.clone())
            .or_default()
            .insert(user_id.clone())
    }

    /// Removes an identity from a room. Returns `false` if it was not present.
    pub fn leave(&mut self, room_id: &RoomId, user_id: &UserId) -> bool {
        let Some(members) = self.rooms.get_mut(room_id) else {
            return false;
        };
        let removed = members.remove(user_id);
        if members.is_empty() {
            self.rooms.remove(room_id);
        }
        removed
    }

    /// Removes an identity from every room, returning the rooms it left.
    pub fn leave_all(&mut self, user_id: &UserId) -> Vec<RoomId> {
        let mut left = Vec::new();
        self.rooms.retain(|room_id, members| {
            if members.remove(user_id) {
                left.push(room_id.clone());
            }
            !members.is_empty()
        });
        left.sort();
        left
    }

    /// Identities present in a room, sorted.
    #[must_use]
    pub fn members(&self, room_id: &RoomId) -> Vec<UserId> {
        self.rooms
            .get(room_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns `true` if the identity is present in the room.
    #[must_use]
    pub fn is_member(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|members| members.contains(user_id))
    }

    /// Rooms the identity is present in, sorted.
    #[must_use]
    pub fn rooms_of(&self, user_id: &UserId) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|(_, members)| members.contains(user_id))
            .map(|(room_id, _)| room_id.clone())
            .collect();
        rooms.sort();
        rooms
    }

    /// Number of rooms with at least one present identity.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
