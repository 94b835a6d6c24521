//! Durable records exchanged with the persistence collaborators.
//!
//! These types cross the wire inside outbound envelopes, so they serialize
//! with camelCase field names.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{MessageId, RoomId, UserId};

/// Durable room metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    /// Room identifier.
    pub id: RoomId,
    /// Display name.
    pub name: String,
    /// Private rooms only admit existing durable members.
    pub is_private: bool,
    /// Number of durable participants.
    pub participant_count: i64,
    /// Time of the most recent message.
    pub last_activity_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A durable room member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Member identity.
    pub user_id: UserId,
    /// When the identity first joined the room.
    pub joined_at: DateTime<Utc>,
    /// Read marker; `None` until the member first reads.
    pub last_read_at: Option<DateTime<Utc>>,
}

/// Content kind of a chat message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text.
    #[default]
    Text,
    /// Image attachment(s).
    Image,
    /// Video attachment(s).
    Video,
    /// Generic file attachment(s).
    File,
}

impl MessageKind {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::File => "file",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "file" => Ok(Self::File),
            other => Err(format!("unknown message kind: {other}")),
        }
    }
}

/// A message about to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    /// Destination room.
    pub room_id: RoomId,
    /// Author.
    pub sender_id: UserId,
    /// Text content (may be empty when media is attached).
    pub content: String,
    /// Content kind.
    pub kind: MessageKind,
    /// Message being replied to.
    pub reply_to_id: Option<MessageId>,
    /// Attached media URLs.
    pub media_urls: Vec<String>,
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    /// Message identifier.
    pub id: MessageId,
    /// Room the message belongs to.
    pub room_id: RoomId,
    /// Author.
    pub sender_id: UserId,
    /// Text content.
    pub content: String,
    /// Content kind.
    #[serde(rename = "messageType")]
    pub kind: MessageKind,
    /// Message being replied to.
    pub reply_to_id: Option<MessageId>,
    /// Attached media URLs.
    pub media_urls: Vec<String>,
    /// Server timestamp.
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    /// Materializes a new message with a fresh id and timestamp.
    #[must_use]
    pub fn from_new(message: NewMessage) -> Self {
        Self {
            id: MessageId::new(),
            room_id: message.room_id,
            sender_id: message.sender_id,
            content: message.content,
            kind: message.kind,
            reply_to_id: message.reply_to_id,
            media_urls: message.media_urls,
            created_at: Utc::now(),
        }
    }
}

/// One identity's reaction to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    /// Reacted-to message.
    pub message_id: MessageId,
    /// Reacting identity.
    pub user_id: UserId,
    /// Reaction kind (an emoji).
    pub emoji: String,
    /// When the reaction was added.
    pub created_at: DateTime<Utc>,
}

/// What a reaction toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionAction {
    /// The reaction did not exist and was created.
    Added,
    /// The reaction existed and was deleted.
    Removed,
}

/// Result of [`super::ReactionStore::toggle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionToggle {
    /// Action taken.
    pub action: ReactionAction,
    /// Every reaction on the message after the toggle.
    pub reactions: Vec<Reaction>,
}

/// Kind of a user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A message arrived in a room the recipient is not viewing.
    NewMessage,
    /// Platform-wide announcement.
    Announcement,
}

impl NotificationKind {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewMessage => "new_message",
            Self::Announcement => "announcement",
        }
    }
}

/// A notification addressed to one identity (or everyone, for announcements).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Notification identifier.
    pub id: uuid::Uuid,
    /// Notification kind.
    pub kind: NotificationKind,
    /// Short title.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Related room, if any.
    pub room_id: Option<RoomId>,
    /// Related message, if any.
    pub message_id: Option<MessageId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Notification for a message posted while the recipient was elsewhere.
    #[must_use]
    pub fn new_message(message: &StoredMessage) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            kind: NotificationKind::NewMessage,
            title: format!("New message in {}", message.room_id),
            body: preview(&message.content),
            room_id: Some(message.room_id.clone()),
            message_id: Some(message.id),
            created_at: Utc::now(),
        }
    }

    /// Platform-wide announcement.
    #[must_use]
    pub fn announcement(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            kind: NotificationKind::Announcement,
            title: title.into(),
            body: body.into(),
            room_id: None,
            message_id: None,
            created_at: Utc::now(),
        }
    }
}

const PREVIEW_CHARS: usize = 100;

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_CHARS {
        return content.to_string();
    }
    let mut short: String = content.chars().take(PREVIEW_CHARS).collect();
    short.push('…');
    short
}
