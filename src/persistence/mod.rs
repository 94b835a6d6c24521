//! Persistence collaborators: durable membership, messages, reactions,
//! read markers, and notifications.
//!
//! The hub only sees these through the async traits below. The concrete
//! implementations are [`postgres::PostgresStore`] (`sqlx::PgPool`) and
//! [`memory::MemoryStore`] (in-process, for development and tests).

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{MessageId, RoomId, UserId};
use crate::error::HubError;
use models::{NewMessage, Notification, Participant, ReactionToggle, RoomInfo, StoredMessage};

/// Durable room membership and room metadata.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Makes `user_id` a durable member of `room_id` if it is not one yet,
    /// incrementing the room's participant counter on first join only.
    /// Returns `true` when a new membership was created.
    ///
    /// # Errors
    ///
    /// [`HubError::RoomNotFound`] for unknown rooms, [`HubError::AccessDenied`]
    /// for private rooms the identity does not belong to, or
    /// [`HubError::Persistence`] on storage failure.
    async fn ensure_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool, HubError>;

    /// Returns the durable membership record, if any.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on storage failure.
    async fn member(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<Option<Participant>, HubError>;

    /// Lists every durable member of a room.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on storage failure.
    async fn list_members(&self, room_id: &RoomId) -> Result<Vec<Participant>, HubError>;

    /// Loads room metadata.
    ///
    /// # Errors
    ///
    /// [`HubError::RoomNotFound`] or [`HubError::Persistence`].
    async fn room(&self, room_id: &RoomId) -> Result<RoomInfo, HubError>;

    /// Bumps the room's last-activity timestamp.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on storage failure.
    async fn record_activity(&self, room_id: &RoomId, at: DateTime<Utc>) -> Result<(), HubError>;
}

/// Durable chat messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persists a message and returns the stored record.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on storage failure.
    async fn append(&self, message: NewMessage) -> Result<StoredMessage, HubError>;

    /// Loads one message.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on storage failure.
    async fn get(&self, message_id: MessageId) -> Result<Option<StoredMessage>, HubError>;
}

/// Durable message reactions.
#[async_trait]
pub trait ReactionStore: Send + Sync {
    /// Deletes the (message, identity, emoji) reaction if present, creates
    /// it otherwise, and returns the message's full reaction set.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on storage failure.
    async fn toggle(
        &self,
        message_id: MessageId,
        user_id: &UserId,
        emoji: &str,
    ) -> Result<ReactionToggle, HubError>;
}

/// Per-member read markers.
#[async_trait]
pub trait ReadMarkerStore: Send + Sync {
    /// Sets the identity's last-read timestamp for a room.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on storage failure.
    async fn update(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), HubError>;
}

/// Durable notification delivery for identities that may be offline.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Stores a notification for later retrieval by the identity.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on storage failure.
    async fn deliver(
        &self,
        user_id: &UserId,
        notification: &Notification,
    ) -> Result<(), HubError>;
}

/// Bundle of every collaborator the hub calls.
#[derive(Clone)]
pub struct Collaborators {
    /// Durable membership and room metadata.
    pub membership: Arc<dyn MembershipStore>,
    /// Chat messages.
    pub messages: Arc<dyn MessageStore>,
    /// Message reactions.
    pub reactions: Arc<dyn ReactionStore>,
    /// Read markers.
    pub read_markers: Arc<dyn ReadMarkerStore>,
    /// Notification storage.
    pub notifications: Arc<dyn NotificationSink>,
}

impl Collaborators {
    /// Uses one store for every collaborator role.
    #[must_use]
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: MembershipStore
            + MessageStore
            + ReactionStore
            + ReadMarkerStore
            + NotificationSink
            + 'static,
    {
        Self {
            membership: Arc::clone(&store) as Arc<dyn MembershipStore>,
            messages: Arc::clone(&store) as Arc<dyn MessageStore>,
            reactions: Arc::clone(&store) as Arc<dyn ReactionStore>,
            read_markers: Arc::clone(&store) as Arc<dyn ReadMarkerStore>,
            notifications: store as Arc<dyn NotificationSink>,
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
