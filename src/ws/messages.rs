//! WebSocket envelopes: inbound client messages and outbound server events.
//!
//! Wire shape: inbound envelopes are flat JSON objects tagged by `type`
//! with camelCase fields; outbound envelopes are
//! `{ "type": ..., "payload": { ... }, "timestamp": ... }`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ConnectionId, MessageId, RoomId, UserId};
use crate::error::{ErrorBody, HubError};
use crate::persistence::models::{
    MessageKind, Notification, Participant, Reaction, ReactionAction, RoomInfo, StoredMessage,
};

/// Every `type` value the hub accepts from clients.
const INBOUND_TYPES: &[&str] = &[
    "join_room",
    "leave_room",
    "chat_message",
    "typing_start",
    "typing_stop",
    "message_reaction",
    "read_messages",
    "ping",
];

/// Client → hub envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum InboundEnvelope {
    /// Become present in a room.
    JoinRoom {
        /// Target room.
        room_id: RoomId,
    },
    /// Stop being present in a room.
    LeaveRoom {
        /// Target room.
        room_id: RoomId,
    },
    /// Post a message to a room.
    ChatMessage {
        /// Target room.
        room_id: RoomId,
        /// Text content.
        content: String,
        /// Message being replied to.
        #[serde(default)]
        reply_to_id: Option<MessageId>,
        /// Content kind; defaults to text.
        #[serde(default)]
        message_type: MessageKind,
        /// Attached media URLs.
        #[serde(default)]
        media_urls: Vec<String>,
    },
    /// Sender started typing.
    TypingStart {
        /// Target room.
        room_id: RoomId,
    },
    /// Sender stopped typing.
    TypingStop {
        /// Target room.
        room_id: RoomId,
    },
    /// Toggle a reaction on a message.
    MessageReaction {
        /// Reacted-to message.
        message_id: MessageId,
        /// Reaction kind.
        emoji: String,
    },
    /// Sender has read the room up to now.
    ReadMessages {
        /// Target room.
        room_id: RoomId,
    },
    /// Application-level keepalive.
    Ping,
}

impl InboundEnvelope {
    /// Parses raw text into an envelope.
    ///
    /// # Errors
    ///
    /// - [`HubError::MalformedEnvelope`] if the text is not a JSON object
    ///   with a string `type` field.
    /// - [`HubError::UnknownMessageType`] if `type` is not recognized.
    /// - [`HubError::InvalidPayload`] if required fields are missing or
    ///   have the wrong shape, or a room id is blank.
    pub fn parse(text: &str) -> Result<Self, HubError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| HubError::MalformedEnvelope(e.to_string()))?;
        let Some(kind) = value.get("type").and_then(serde_json::Value::as_str) else {
            return Err(HubError::MalformedEnvelope(
                "missing string field `type`".to_string(),
            ));
        };
        if !INBOUND_TYPES.contains(&kind) {
            return Err(HubError::UnknownMessageType(kind.to_string()));
        }
        let envelope: Self =
            serde_json::from_value(value).map_err(|e| HubError::InvalidPayload(e.to_string()))?;
        if envelope
            .room_id()
            .is_some_and(|room_id| room_id.as_str().trim().is_empty())
        {
            return Err(HubError::InvalidPayload("roomId must not be empty".to_string()));
        }
        Ok(envelope)
    }

    /// Room the envelope targets, if it names one.
    #[must_use]
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::JoinRoom { room_id }
            | Self::LeaveRoom { room_id }
            | Self::ChatMessage { room_id, .. }
            | Self::TypingStart { room_id }
            | Self::TypingStop { room_id }
            | Self::ReadMessages { room_id } => Some(room_id),
            Self::MessageReaction { .. } | Self::Ping => None,
        }
    }

    /// Wire name of this envelope's type.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join_room",
            Self::LeaveRoom { .. } => "leave_room",
            Self::ChatMessage { .. } => "chat_message",
            Self::TypingStart { .. } => "typing_start",
            Self::TypingStop { .. } => "typing_stop",
            Self::MessageReaction { .. } => "message_reaction",
            Self::ReadMessages { .. } => "read_messages",
            Self::Ping => "ping",
        }
    }
}

/// Hub → client event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Handshake succeeded.
    Connected {
        /// Resolved identity.
        user_id: UserId,
        /// This connection's id.
        connection_id: ConnectionId,
        /// Seconds between liveness probes.
        heartbeat_interval_secs: u64,
    },
    /// Snapshot sent to an identity that just joined a room.
    RoomJoined {
        /// Durable room metadata.
        room: RoomInfo,
        /// Durable participants.
        participants: Vec<Participant>,
        /// Identities present on this hub.
        online_users: Vec<UserId>,
    },
    /// An identity became present in a room.
    UserJoined {
        /// Room.
        room_id: RoomId,
        /// Identity.
        user_id: UserId,
    },
    /// An identity left a room.
    UserLeft {
        /// Room.
        room_id: RoomId,
        /// Identity.
        user_id: UserId,
    },
    /// An identity's last connection closed while present in a room.
    UserOffline {
        /// Room.
        room_id: RoomId,
        /// Identity.
        user_id: UserId,
    },
    /// A message was posted.
    NewMessage {
        /// Stored message.
        message: StoredMessage,
        /// Author's membership record.
        sender: Participant,
        /// Message being replied to, if any.
        reply_to: Option<StoredMessage>,
    },
    /// An identity started typing.
    TypingStart {
        /// Room.
        room_id: RoomId,
        /// Identity.
        user_id: UserId,
    },
    /// An identity stopped typing (explicitly or by expiry).
    TypingStop {
        /// Room.
        room_id: RoomId,
        /// Identity.
        user_id: UserId,
    },
    /// A reaction was toggled.
    ReactionUpdate {
        /// Room of the message.
        room_id: RoomId,
        /// Reacted-to message.
        message_id: MessageId,
        /// Identity that toggled.
        user_id: UserId,
        /// Reaction kind.
        emoji: String,
        /// Whether the reaction was added or removed.
        action: ReactionAction,
        /// Full reaction set after the toggle.
        reactions: Vec<Reaction>,
    },
    /// An identity's read marker moved.
    MessagesRead {
        /// Room.
        room_id: RoomId,
        /// Identity.
        user_id: UserId,
        /// New read marker.
        read_at: DateTime<Utc>,
    },
    /// Reply to `ping`.
    Pong,
    /// Error addressed to the originating identity only.
    Error {
        /// Numeric error code.
        code: u32,
        /// Human-readable message.
        message: String,
    },
    /// Notification pushed to a connected identity.
    Notification {
        /// Notification record.
        notification: Notification,
    },
}

impl From<&HubError> for ServerEvent {
    fn from(err: &HubError) -> Self {
        let ErrorBody { code, message } = err.body();
        Self::Error { code, message }
    }
}

/// Timestamped, immutable outbound envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEnvelope {
    /// Event and its payload.
    #[serde(flatten)]
    pub event: ServerEvent,
    /// Server timestamp.
    pub timestamp: DateTime<Utc>,
}

impl OutboundEnvelope {
    /// Stamps an event with the current time.
    #[must_use]
    pub fn new(event: ServerEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }

    /// Serializes once for fan-out to any number of connections.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Internal`] if serialization fails.
    pub fn to_frame_text(&self) -> Result<Arc<str>, HubError> {
        serde_json::to_string(self)
            .map(Arc::from)
            .map_err(|e| HubError::Internal(format!("envelope serialization: {e}")))
    }
}

impl From<ServerEvent> for OutboundEnvelope {
    fn from(event: ServerEvent) -> Self {
        Self::new(event)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn parse(text: &str) -> InboundEnvelope {
        match InboundEnvelope::parse(text) {
            Ok(envelope) => envelope,
            Err(err) => panic!("parse failed for {text}: {err}"),
        }
    }

    #[test]
    fn parses_room_envelopes() {
        assert_eq!(
            parse(r#"{"type":"join_room","roomId":"r1"}"#),
            InboundEnvelope::JoinRoom {
                room_id: RoomId::from("r1")
            }
        );
        assert_eq!(
            parse(r#"{"type":"typing_stop","roomId":"r1","extra":true}"#).kind(),
            "typing_stop"
        );
        assert_eq!(parse(r#"{"type":"ping"}"#), InboundEnvelope::Ping);
    }

    #[test]
    fn chat_message_optional_fields_default() {
        let InboundEnvelope::ChatMessage {
            content,
            reply_to_id,
            message_type,
            media_urls,
            ..
        } = parse(r#"{"type":"chat_message","roomId":"r1","content":"hi"}"#)
        else {
            panic!("expected chat message");
        };
        assert_eq!(content, "hi");
        assert_eq!(reply_to_id, None);
        assert_eq!(message_type, MessageKind::Text);
        assert!(media_urls.is_empty());
    }

    #[test]
    fn chat_message_reads_media_and_reply() {
        let reply = uuid::Uuid::new_v4();
        let text = format!(
            r#"{{"type":"chat_message","roomId":"r1","content":"","replyToId":"{reply}","messageType":"image","mediaUrls":["https://cdn/x.png"]}}"#
        );
        let InboundEnvelope::ChatMessage {
            reply_to_id,
            message_type,
            media_urls,
            ..
        } = parse(&text)
        else {
            panic!("expected chat message");
        };
        assert_eq!(reply_to_id, Some(MessageId::from_uuid(reply)));
        assert_eq!(message_type, MessageKind::Image);
        assert_eq!(media_urls, vec!["https://cdn/x.png".to_string()]);
    }

    #[test]
    fn unknown_type_is_reported_by_name() {
        let result = InboundEnvelope::parse(r#"{"type":"teleport","roomId":"r1"}"#);
        let Err(HubError::UnknownMessageType(kind)) = result else {
            panic!("expected unknown type, got {result:?}");
        };
        assert_eq!(kind, "teleport");
    }

    #[test]
    fn malformed_and_incomplete_envelopes_are_rejected() {
        assert!(matches!(
            InboundEnvelope::parse("not json"),
            Err(HubError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            InboundEnvelope::parse(r#"{"roomId":"r1"}"#),
            Err(HubError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            InboundEnvelope::parse(r#"{"type":"join_room"}"#),
            Err(HubError::InvalidPayload(_))
        ));
        assert!(matches!(
            InboundEnvelope::parse(r#"{"type":"message_reaction","messageId":"nope","emoji":"x"}"#),
            Err(HubError::InvalidPayload(_))
        ));
    }

    #[test]
    fn blank_room_id_is_invalid() {
        for text in [
            r#"{"type":"join_room","roomId":""}"#,
            r#"{"type":"typing_start","roomId":"  "}"#,
            r#"{"type":"chat_message","roomId":"","content":"hi"}"#,
        ] {
            let result = InboundEnvelope::parse(text);
            assert!(
                matches!(result, Err(HubError::InvalidPayload(_))),
                "{text} gave {result:?}"
            );
        }
        assert_eq!(
            parse(r#"{"type":"read_messages","roomId":"r1"}"#).room_id(),
            Some(&RoomId::from("r1"))
        );
    }

    #[test]
    fn outbound_envelope_has_type_payload_timestamp() {
        let envelope = OutboundEnvelope::new(ServerEvent::UserJoined {
            room_id: RoomId::from("r1"),
            user_id: UserId::from("a"),
        });
        let Ok(value) = serde_json::to_value(&envelope) else {
            panic!("serialization failed");
        };
        assert_eq!(value["type"], "user_joined");
        assert_eq!(value["payload"]["roomId"], "r1");
        assert_eq!(value["payload"]["userId"], "a");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn pong_has_no_payload() {
        let Ok(value) = serde_json::to_value(OutboundEnvelope::new(ServerEvent::Pong)) else {
            panic!("serialization failed");
        };
        assert_eq!(value["type"], "pong");
        assert!(value.get("payload").is_none());
    }

    #[test]
    fn error_event_carries_code() {
        let event = ServerEvent::from(&HubError::UnknownMessageType("x".into()));
        assert_eq!(
            event,
            ServerEvent::Error {
                code: 1002,
                message: "unknown message type: x".to_string()
            }
        );
    }
}
