//! In-process implementation of every persistence collaborator.
//!
//! Used when `PERSISTENCE_ENABLED=false` and by the test suite. Unknown
//! rooms are created lazily as public rooms on first join; private rooms
//! must be seeded with [`MemoryStore::create_room`].

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::models::{
    NewMessage, Notification, Participant, Reaction, ReactionAction, ReactionToggle, RoomInfo,
    StoredMessage,
};
use super::{MembershipStore, MessageStore, NotificationSink, ReactionStore, ReadMarkerStore};
use crate::domain::{MessageId, RoomId, UserId};
use crate::error::HubError;

#[derive(Debug, Default)]
struct MemoryState {
    rooms: HashMap<RoomId, RoomInfo>,
    members: HashMap<RoomId, BTreeMap<UserId, Participant>>,
    messages: HashMap<MessageId, StoredMessage>,
    reactions: HashMap<MessageId, Vec<Reaction>>,
    notifications: HashMap<UserId, Vec<Notification>>,
}

impl MemoryState {
    fn room_entry(&mut self, room_id: &RoomId) -> &mut RoomInfo {
        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| RoomInfo {
                id: room_id.clone(),
                name: room_id.to_string(),
                is_private: false,
                participant_count: 0,
                last_activity_at: None,
                created_at: Utc::now(),
            })
    }
}

/// In-memory store backed by a single [`RwLock`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or replaces the metadata of) a room.
    pub async fn create_room(&self, room_id: &RoomId, name: &str, is_private: bool) -> RoomInfo {
        let mut state = self.state.write().await;
        let room = state.room_entry(room_id);
        room.name = name.to_string();
        room.is_private = is_private;
        room.clone()
    }

    /// Adds a durable member directly, bypassing access checks.
    pub async fn add_member(&self, room_id: &RoomId, user_id: &UserId) {
        let mut state = self.state.write().await;
        let _ = state.room_entry(room_id);
        insert_member(&mut state, room_id, user_id);
    }

    /// Notifications stored for an identity, oldest first.
    pub async fn notifications_for(&self, user_id: &UserId) -> Vec<Notification> {
        self.state
            .read()
            .await
            .notifications
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Messages stored for a room, oldest first.
    pub async fn messages_in(&self, room_id: &RoomId) -> Vec<StoredMessage> {
        let state = self.state.read().await;
        let mut messages: Vec<StoredMessage> = state
            .messages
            .values()
            .filter(|m| &m.room_id == room_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        messages
    }
}

fn insert_member(state: &mut MemoryState, room_id: &RoomId, user_id: &UserId) -> bool {
    let members = state.members.entry(room_id.clone()).or_default();
    if members.contains_key(user_id) {
        return false;
    }
    members.insert(
        user_id.clone(),
        Participant {
            user_id: user_id.clone(),
            joined_at: Utc::now(),
            last_read_at: None,
        },
    );
    let room = state.room_entry(room_id);
    room.participant_count = room.participant_count.saturating_add(1);
    true
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn ensure_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool, HubError> {
        let mut state = self.state.write().await;
        let is_private = state.room_entry(room_id).is_private;
        let already = state
            .members
            .get(room_id)
            .is_some_and(|members| members.contains_key(user_id));
        if already {
            return Ok(false);
        }
        if is_private {
            return Err(HubError::AccessDenied(room_id.clone()));
        }
        Ok(insert_member(&mut state, room_id, user_id))
    }

    async fn member(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<Option<Participant>, HubError> {
        let state = self.state.read().await;
        Ok(state
            .members
            .get(room_id)
            .and_then(|members| members.get(user_id))
            .cloned())
    }

    async fn list_members(&self, room_id: &RoomId) -> Result<Vec<Participant>, HubError> {
        let state = self.state.read().await;
        Ok(state
            .members
            .get(room_id)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn room(&self, room_id: &RoomId) -> Result<RoomInfo, HubError> {
        let state = self.state.read().await;
        state
            .rooms
            .get(room_id)
            .cloned()
            .ok_or_else(|| HubError::RoomNotFound(room_id.clone()))
    }

    async fn record_activity(&self, room_id: &RoomId, at: DateTime<Utc>) -> Result<(), HubError> {
        let mut state = self.state.write().await;
        let room = state
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| HubError::RoomNotFound(room_id.clone()))?;
        room.last_activity_at = Some(at);
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append(&self, message: NewMessage) -> Result<StoredMessage, HubError> {
        let stored = StoredMessage::from_new(message);
        let mut state = self.state.write().await;
        state.messages.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, message_id: MessageId) -> Result<Option<StoredMessage>, HubError> {
        Ok(self.state.read().await.messages.get(&message_id).cloned())
    }
}

#[async_trait]
impl ReactionStore for MemoryStore {
    async fn toggle(
        &self,
        message_id: MessageId,
        user_id: &UserId,
        emoji: &str,
    ) -> Result<ReactionToggle, HubError> {
        let mut state = self.state.write().await;
        let reactions = state.reactions.entry(message_id).or_default();
        let before = reactions.len();
        reactions.retain(|r| !(&r.user_id == user_id && r.emoji == emoji));
        let action = if reactions.len() < before {
            ReactionAction::Removed
        } else {
            reactions.push(Reaction {
                message_id,
                user_id: user_id.clone(),
                emoji: emoji.to_string(),
                created_at: Utc::now(),
            });
            ReactionAction::Added
        };
        Ok(ReactionToggle {
            action,
            reactions: reactions.clone(),
        })
    }
}

#[async_trait]
impl ReadMarkerStore for MemoryStore {
    async fn update(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), HubError> {
        let mut state = self.state.write().await;
        if let Some(participant) = state
            .members
            .get_mut(room_id)
            .and_then(|members| members.get_mut(user_id))
        {
            participant.last_read_at = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for MemoryStore {
    async fn deliver(
        &self,
        user_id: &UserId,
        notification: &Notification,
    ) -> Result<(), HubError> {
        let mut state = self.state.write().await;
        state
            .notifications
            .entry(user_id.clone())
            .or_default()
            .push(notification.clone());
        Ok(())
    }
}
