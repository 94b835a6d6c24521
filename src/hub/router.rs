//! Inbound envelope dispatch.
//!
//! [`dispatch`] maps (hub, session, envelope) to side effects. Handlers
//! read whatever shared state they need, release the lock, call the
//! collaborators, and only then apply state changes and broadcast. A
//! failing handler produces an `error` envelope for the sender's identity
//! and nothing else; the connection stays active.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::connection::ConnectionHandle;
use crate::domain::{ConnectionId, MessageId, RoomId, UserId};
use crate::error::HubError;
use crate::persistence::models::{MessageKind, NewMessage, Notification, StoredMessage};
use crate::ws::messages::{InboundEnvelope, ServerEvent};

use super::Hub;

/// Longest accepted reaction string, in characters.
const MAX_EMOJI_CHARS: usize = 32;

/// Most media attachments per message.
const MAX_MEDIA_URLS: usize = 10;

/// The authenticated identity and connection an envelope arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Sender identity.
    pub user_id: UserId,
    /// Originating connection.
    pub connection_id: ConnectionId,
}

impl From<&ConnectionHandle> for Session {
    fn from(handle: &ConnectionHandle) -> Self {
        Self {
            user_id: handle.user_id().clone(),
            connection_id: handle.id(),
        }
    }
}

/// Parses raw inbound text and dispatches it.
///
/// Text from a session that is no longer registered (evicted or torn
/// down) is dropped.
pub async fn handle_text(hub: &Arc<Hub>, session: &Session, text: &str) {
    if !is_live(hub, session).await {
        return;
    }
    match InboundEnvelope::parse(text) {
        Ok(envelope) => dispatch(hub, session, envelope).await,
        Err(err) => report(hub, session, "unparsed", &err).await,
    }
}

/// Dispatches one envelope to its handler.
pub async fn dispatch(hub: &Arc<Hub>, session: &Session, envelope: InboundEnvelope) {
    let kind = envelope.kind();
    if !is_live(hub, session).await {
        return;
    }
    tracing::trace!(user_id = %session.user_id, kind, "dispatching envelope");
    let result = match envelope {
        InboundEnvelope::JoinRoom { room_id } => join_room(hub, session, room_id).await,
        InboundEnvelope::LeaveRoom { room_id } => leave_room(hub, session, room_id).await,
        InboundEnvelope::ChatMessage {
            room_id,
            content,
            reply_to_id,
            message_type,
            media_urls,
        } => {
            chat_message(
                hub,
                session,
                NewMessage {
                    room_id,
                    sender_id: session.user_id.clone(),
                    content,
                    kind: message_type,
                    reply_to_id,
                    media_urls,
                },
            )
            .await
        }
        InboundEnvelope::TypingStart { room_id } => hub.start_typing(session, &room_id).await,
        InboundEnvelope::TypingStop { room_id } => {
            hub.stop_typing(&room_id, &session.user_id).await;
            Ok(())
        }
        InboundEnvelope::MessageReaction { message_id, emoji } => {
            message_reaction(hub, session, message_id, emoji).await
        }
        InboundEnvelope::ReadMessages { room_id } => read_messages(hub, session, room_id).await,
        InboundEnvelope::Ping => {
            ping(hub, session).await;
            Ok(())
        }
    };
    if let Err(err) = result {
        report(hub, session, kind, &err).await;
    }
}

async fn is_live(hub: &Hub, session: &Session) -> bool {
    let live = hub
        .is_registered(&session.user_id, session.connection_id)
        .await;
    if !live {
        tracing::debug!(
            user_id = %session.user_id,
            connection_id = %session.connection_id,
            "dropping envelope from unregistered session"
        );
    }
    live
}

async fn report(hub: &Hub, session: &Session, kind: &str, err: &HubError) {
    tracing::warn!(
        user_id = %session.user_id,
        connection_id = %session.connection_id,
        kind,
        code = err.error_code(),
        error = %err,
        "envelope rejected"
    );
    hub.send_error(&session.user_id, err).await;
}

async fn join_room(hub: &Arc<Hub>, session: &Session, room_id: RoomId) -> Result<(), HubError> {
    let user_id = &session.user_id;
    let membership = &hub.collaborators.membership;

    let first_join = membership.ensure_member(&room_id, user_id).await?;
    let room = membership.room(&room_id).await?;
    let participants = membership.list_members(&room_id).await?;

    // Registry before presence. A teardown that ran during the collaborator
    // calls has already cleared presence, so the join must not land.
    let online_users = {
        let connections = hub.connections.read().await;
        if connections.get(user_id, session.connection_id).is_none() {
            tracing::debug!(%user_id, %room_id, "session closed before join completed");
            return Ok(());
        }
        let mut presence = hub.presence.write().await;
        presence.join(&room_id, user_id);
        presence.members(&room_id)
    };
    tracing::info!(%user_id, %room_id, first_join, "joined room");

    hub.broadcast_to_room(
        &room_id,
        ServerEvent::UserJoined {
            room_id: room_id.clone(),
            user_id: user_id.clone(),
        },
        None,
    )
    .await;

    let snapshot = ServerEvent::RoomJoined {
        room,
        participants,
        online_users,
    };
    if let Some(handle) = connection(hub, session).await {
        hub.send_to_connection(&handle, snapshot);
    }
    Ok(())
}

async fn leave_room(hub: &Arc<Hub>, session: &Session, room_id: RoomId) -> Result<(), HubError> {
    let user_id = &session.user_id;
    if !hub.presence.write().await.leave(&room_id, user_id) {
        return Ok(());
    }
    hub.stop_typing(&room_id, user_id).await;
    hub.broadcast_to_room(
        &room_id,
        ServerEvent::UserLeft {
            room_id: room_id.clone(),
            user_id: user_id.clone(),
        },
        None,
    )
    .await;
    tracing::info!(%user_id, %room_id, "left room");
    Ok(())
}

fn validate_message(message: &NewMessage, max_chars: usize) -> Result<(), HubError> {
    if message.content.trim().is_empty() && message.media_urls.is_empty() {
        return Err(HubError::InvalidPayload(
            "message needs content or media".to_string(),
        ));
    }
    if message.content.chars().count() > max_chars {
        return Err(HubError::InvalidPayload(format!(
            "message exceeds {max_chars} characters"
        )));
    }
    if message.media_urls.len() > MAX_MEDIA_URLS {
        return Err(HubError::InvalidPayload(format!(
            "at most {MAX_MEDIA_URLS} media attachments"
        )));
    }
    if message.kind != MessageKind::Text && message.media_urls.is_empty() {
        return Err(HubError::InvalidPayload(format!(
            "{} message without media",
            message.kind
        )));
    }
    Ok(())
}

async fn chat_message(
    hub: &Arc<Hub>,
    session: &Session,
    message: NewMessage,
) -> Result<(), HubError> {
    validate_message(&message, hub.settings.max_message_length)?;
    let collaborators = &hub.collaborators;
    let room_id = message.room_id.clone();
    let user_id = &session.user_id;

    let sender = collaborators
        .membership
        .member(&room_id, user_id)
        .await?
        .ok_or_else(|| HubError::NotRoomMember(room_id.clone()))?;

    let reply_to = match message.reply_to_id {
        Some(reply_id) => {
            let target = collaborators
                .messages
                .get(reply_id)
                .await?
                .ok_or(HubError::MessageNotFound(reply_id))?;
            if target.room_id != room_id {
                return Err(HubError::InvalidPayload(
                    "reply target belongs to another room".to_string(),
                ));
            }
            Some(target)
        }
        None => None,
    };

    let stored = collaborators.messages.append(message).await?;

    // The message is durable at this point; a failed activity bump must not
    // suppress its broadcast.
    if let Err(err) = collaborators
        .membership
        .record_activity(&room_id, stored.created_at)
        .await
    {
        tracing::warn!(%room_id, error = %err, "room activity not recorded");
    }

    hub.broadcast_to_room(
        &room_id,
        ServerEvent::NewMessage {
            message: stored.clone(),
            sender,
            reply_to,
        },
        None,
    )
    .await;
    tracing::debug!(%user_id, %room_id, message_id = %stored.id, "message posted");

    // Sending a message ends the sender's typing indicator.
    hub.stop_typing(&room_id, user_id).await;

    notify_absent_members(hub, &stored).await;
    Ok(())
}

/// Notifies durable members who are not present in the message's room.
async fn notify_absent_members(hub: &Hub, message: &StoredMessage) {
    let members = match hub
        .collaborators
        .membership
        .list_members(&message.room_id)
        .await
    {
        Ok(members) => members,
        Err(err) => {
            tracing::warn!(room_id = %message.room_id, error = %err, "skipping notifications");
            return;
        }
    };
    let present = hub.room_members(&message.room_id).await;
    let notification = Notification::new_message(message);
    for member in members {
        if member.user_id == message.sender_id || present.contains(&member.user_id) {
            continue;
        }
        if let Err(err) = hub.notify(&member.user_id, notification.clone()).await {
            tracing::warn!(user_id = %member.user_id, error = %err, "notification not delivered");
        }
    }
}

async fn message_reaction(
    hub: &Arc<Hub>,
    session: &Session,
    message_id: MessageId,
    emoji: String,
) -> Result<(), HubError> {
    let emoji = emoji.trim().to_string();
    if emoji.is_empty() || emoji.chars().count() > MAX_EMOJI_CHARS {
        return Err(HubError::InvalidPayload("invalid reaction".to_string()));
    }
    let collaborators = &hub.collaborators;
    let user_id = &session.user_id;

    let message = collaborators
        .messages
        .get(message_id)
        .await?
        .ok_or(HubError::MessageNotFound(message_id))?;
    let room_id = message.room_id;
    if collaborators
        .membership
        .member(&room_id, user_id)
        .await?
        .is_none()
    {
        return Err(HubError::NotRoomMember(room_id));
    }

    let toggle = collaborators
        .reactions
        .toggle(message_id, user_id, &emoji)
        .await?;
    tracing::debug!(%user_id, %message_id, action = ?toggle.action, "reaction toggled");

    hub.broadcast_to_room(
        &room_id,
        ServerEvent::ReactionUpdate {
            room_id: room_id.clone(),
            message_id,
            user_id: user_id.clone(),
            emoji,
            action: toggle.action,
            reactions: toggle.reactions,
        },
        None,
    )
    .await;
    Ok(())
}

async fn read_messages(hub: &Arc<Hub>, session: &Session, room_id: RoomId) -> Result<(), HubError> {
    let collaborators = &hub.collaborators;
    let user_id = &session.user_id;
    if collaborators
        .membership
        .member(&room_id, user_id)
        .await?
        .is_none()
    {
        return Err(HubError::NotRoomMember(room_id));
    }

    let read_at = Utc::now();
    collaborators
        .read_markers
        .update(&room_id, user_id, read_at)
        .await?;

    hub.broadcast_to_room(
        &room_id,
        ServerEvent::MessagesRead {
            room_id: room_id.clone(),
            user_id: user_id.clone(),
            read_at,
        },
        None,
    )
    .await;
    Ok(())
}

async fn ping(hub: &Hub, session: &Session) {
    hub.mark_alive(&session.user_id, session.connection_id).await;
    if let Some(handle) = connection(hub, session).await {
        hub.send_to_connection(&handle, ServerEvent::Pong);
    }
}

async fn connection(hub: &Hub, session: &Session) -> Option<ConnectionHandle> {
    hub.connections
        .read()
        .await
        .get(&session.user_id, session.connection_id)
        .cloned()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::super::HubSettings;
    use super::super::test_support::{TestClient, test_hub, test_hub_with};
    use super::*;
    use crate::persistence::memory::MemoryStore;
    use crate::persistence::{Collaborators, MessageStore};

    const JOIN_R1: &str = r#"{"type":"join_room","roomId":"R1"}"#;

    fn chat(content: &str) -> String {
        format!(r#"{{"type":"chat_message","roomId":"R1","content":"{content}"}}"#)
    }

    #[tokio::test]
    async fn join_sends_snapshot_and_announces() {
        let (hub, _store) = test_hub();
        let mut a = TestClient::connect(&hub, "A").await;
        a.send(&hub, JOIN_R1).await;

        let joined = a.expect("user_joined");
        assert_eq!(joined["payload"]["userId"], "A");
        let snapshot = a.expect("room_joined");
        assert_eq!(snapshot["payload"]["onlineUsers"], serde_json::json!(["A"]));
        assert_eq!(snapshot["payload"]["room"]["participantCount"], 1);
        assert_eq!(snapshot["payload"]["participants"][0]["userId"], "A");
        assert!(hub.is_present(&RoomId::from("R1"), &UserId::from("A")).await);
    }

    #[tokio::test]
    async fn scenario_two_users_chat_then_one_disconnects() {
        let (hub, _store) = test_hub();
        let mut a = TestClient::connect(&hub, "A").await;
        let mut b = TestClient::connect(&hub, "B").await;

        a.send(&hub, JOIN_R1).await;
        let a_snapshot = a.expect("room_joined");
        assert_eq!(a_snapshot["payload"]["onlineUsers"], serde_json::json!(["A"]));

        b.send(&hub, JOIN_R1).await;
        assert_eq!(a.expect("user_joined")["payload"]["userId"], "B");
        assert_eq!(b.expect("user_joined")["payload"]["userId"], "B");
        let b_snapshot = b.expect("room_joined");
        assert_eq!(
            b_snapshot["payload"]["onlineUsers"],
            serde_json::json!(["A", "B"])
        );

        b.send(&hub, &chat("hi")).await;
        for client in [&mut a, &mut b] {
            let message = client.expect("new_message");
            assert_eq!(message["payload"]["message"]["content"], "hi");
            assert_eq!(message["payload"]["message"]["senderId"], "B");
            assert_eq!(message["payload"]["sender"]["userId"], "B");
        }

        a.disconnect(&hub).await;
        assert_eq!(b.expect("user_offline")["payload"]["userId"], "A");
        assert_eq!(
            hub.room_members(&RoomId::from("R1")).await,
            vec![UserId::from("B")]
        );
    }

    #[tokio::test]
    async fn non_member_chat_is_rejected_without_broadcast() {
        let (hub, _store) = test_hub();
        let mut member = TestClient::connect(&hub, "A").await;
        let mut intruder = TestClient::connect(&hub, "X").await;
        member.send(&hub, JOIN_R1).await;
        member.drain();
        intruder.drain();

        intruder.send(&hub, &chat("spam")).await;

        let error = intruder.expect("error");
        assert_eq!(error["payload"]["code"], 2003);
        assert!(member.drain().is_empty());
    }

    #[tokio::test]
    async fn leave_removes_presence_and_announces() {
        let (hub, _store) = test_hub();
        let a = TestClient::connect(&hub, "A").await;
        let mut b = TestClient::connect(&hub, "B").await;
        a.send(&hub, JOIN_R1).await;
        b.send(&hub, JOIN_R1).await;
        b.drain();

        a.send(&hub, r#"{"type":"leave_room","roomId":"R1"}"#).await;
        assert_eq!(b.expect("user_left")["payload"]["userId"], "A");
        assert!(!hub.is_present(&RoomId::from("R1"), &UserId::from("A")).await);

        // Leaving again is a no-op.
        a.send(&hub, r#"{"type":"leave_room","roomId":"R1"}"#).await;
        assert!(b.drain().is_empty());
    }

    #[tokio::test]
    async fn unknown_and_malformed_envelopes_get_errors() {
        let (hub, _store) = test_hub();
        let mut a = TestClient::connect(&hub, "A").await;
        a.drain();

        a.send(&hub, r#"{"type":"teleport"}"#).await;
        assert_eq!(a.expect("error")["payload"]["code"], 1002);
        a.send(&hub, "{{{").await;
        assert_eq!(a.expect("error")["payload"]["code"], 1001);
        a.send(&hub, r#"{"type":"chat_message","roomId":"R1"}"#).await;
        assert_eq!(a.expect("error")["payload"]["code"], 1003);

        assert!(hub.is_online(&UserId::from("A")).await);
    }

    #[tokio::test]
    async fn ping_replies_to_sender_connection_only() {
        let (hub, _store) = test_hub();
        let mut phone = TestClient::connect(&hub, "A").await;
        let mut laptop = TestClient::connect(&hub, "A").await;
        phone.drain();
        laptop.drain();

        phone.send(&hub, r#"{"type":"ping"}"#).await;
        assert_eq!(phone.kinds(), vec!["pong"]);
        assert!(laptop.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn typing_expires_with_one_start_and_one_stop() {
        let (hub, _store) = test_hub();
        let a = TestClient::connect(&hub, "A").await;
        let mut b = TestClient::connect(&hub, "B").await;
        a.send(&hub, JOIN_R1).await;
        b.send(&hub, JOIN_R1).await;
        b.drain();

        a.send(&hub, r#"{"type":"typing_start","roomId":"R1"}"#).await;
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(b.kinds(), vec!["typing_start", "typing_stop"]);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(b.drain().is_empty());
        assert!(!hub.is_typing(&RoomId::from("R1"), &UserId::from("A")).await);
    }

    #[tokio::test(start_paused = true)]
    async fn typing_is_not_echoed_to_sender() {
        let (hub, _store) = test_hub();
        let mut a = TestClient::connect(&hub, "A").await;
        a.send(&hub, JOIN_R1).await;
        a.drain();

        a.send(&hub, r#"{"type":"typing_start","roomId":"R1"}"#).await;
        a.send(&hub, r#"{"type":"typing_stop","roomId":"R1"}"#).await;
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(a.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn chat_message_stops_sender_typing() {
        let (hub, _store) = test_hub();
        let a = TestClient::connect(&hub, "A").await;
        let mut b = TestClient::connect(&hub, "B").await;
        a.send(&hub, JOIN_R1).await;
        b.send(&hub, JOIN_R1).await;
        b.drain();

        a.send(&hub, r#"{"type":"typing_start","roomId":"R1"}"#).await;
        a.send(&hub, &chat("done")).await;
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(b.kinds(), vec!["typing_start", "new_message", "typing_stop"]);
    }

    #[tokio::test]
    async fn typing_requires_presence() {
        let (hub, _store) = test_hub();
        let mut a = TestClient::connect(&hub, "A").await;
        a.drain();
        a.send(&hub, r#"{"type":"typing_start","roomId":"R1"}"#).await;
        assert_eq!(a.expect("error")["payload"]["code"], 2004);
    }

    #[tokio::test]
    async fn double_reaction_adds_then_removes() {
        let (hub, store) = test_hub();
        let mut a = TestClient::connect(&hub, "A").await;
        a.send(&hub, JOIN_R1).await;
        a.send(&hub, &chat("react to me")).await;
        let Some(message) = store.messages_in(&RoomId::from("R1")).await.into_iter().next() else {
            panic!("message should be stored");
        };
        a.drain();

        let react = format!(
            r#"{{"type":"message_reaction","messageId":"{}","emoji":"👍"}}"#,
            message.id
        );
        a.send(&hub, &react).await;
        a.send(&hub, &react).await;

        let first = a.expect("reaction_update");
        assert_eq!(first["payload"]["action"], "added");
        assert_eq!(first["payload"]["reactions"].as_array().map(Vec::len), Some(1));
        let second = a.expect("reaction_update");
        assert_eq!(second["payload"]["action"], "removed");
        assert_eq!(second["payload"]["reactions"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn reaction_to_missing_message_is_not_found() {
        let (hub, _store) = test_hub();
        let mut a = TestClient::connect(&hub, "A").await;
        a.drain();
        let react = format!(
            r#"{{"type":"message_reaction","messageId":"{}","emoji":"👍"}}"#,
            MessageId::new()
        );
        a.send(&hub, &react).await;
        assert_eq!(a.expect("error")["payload"]["code"], 3002);
    }

    #[tokio::test]
    async fn reply_context_is_resolved() {
        let (hub, store) = test_hub();
        let mut a = TestClient::connect(&hub, "A").await;
        a.send(&hub, JOIN_R1).await;
        a.send(&hub, &chat("original")).await;
        let Some(original) = store.messages_in(&RoomId::from("R1")).await.into_iter().next() else {
            panic!("message should be stored");
        };
        a.drain();

        let reply = format!(
            r#"{{"type":"chat_message","roomId":"R1","content":"reply","replyToId":"{}"}}"#,
            original.id
        );
        a.send(&hub, &reply).await;
        let message = a.expect("new_message");
        assert_eq!(message["payload"]["replyTo"]["content"], "original");
        assert_eq!(
            message["payload"]["message"]["replyToId"],
            original.id.to_string()
        );
    }

    #[tokio::test]
    async fn read_messages_updates_marker_and_broadcasts() {
        let (hub, store) = test_hub();
        let a = TestClient::connect(&hub, "A").await;
        let mut b = TestClient::connect(&hub, "B").await;
        a.send(&hub, JOIN_R1).await;
        b.send(&hub, JOIN_R1).await;
        b.drain();

        a.send(&hub, r#"{"type":"read_messages","roomId":"R1"}"#).await;
        let read = b.expect("messages_read");
        assert_eq!(read["payload"]["userId"], "A");

        let Ok(Some(participant)) = crate::persistence::MembershipStore::member(
            store.as_ref(),
            &RoomId::from("R1"),
            &UserId::from("A"),
        )
        .await
        else {
            panic!("A should be a durable member");
        };
        assert!(participant.last_read_at.is_some());
    }

    #[tokio::test]
    async fn private_room_join_is_denied() {
        let (hub, store) = test_hub();
        store.create_room(&RoomId::from("vip"), "VIP", true).await;
        let mut a = TestClient::connect(&hub, "A").await;
        a.drain();

        a.send(&hub, r#"{"type":"join_room","roomId":"vip"}"#).await;
        assert_eq!(a.expect("error")["payload"]["code"], 2005);
        assert!(!hub.is_present(&RoomId::from("vip"), &UserId::from("A")).await);
    }

    #[tokio::test]
    async fn absent_members_are_notified() {
        let (hub, store) = test_hub();
        let a = TestClient::connect(&hub, "A").await;
        let mut b = TestClient::connect(&hub, "B").await;
        store.add_member(&RoomId::from("R1"), &UserId::from("B")).await;
        store.add_member(&RoomId::from("R1"), &UserId::from("C")).await;
        a.send(&hub, JOIN_R1).await;
        b.drain();

        a.send(&hub, &chat("anyone?")).await;

        assert_eq!(b.kinds(), vec!["notification"]);
        assert_eq!(store.notifications_for(&UserId::from("C")).await.len(), 1);
        assert!(store.notifications_for(&UserId::from("A")).await.is_empty());
    }

    #[tokio::test]
    async fn oversized_message_is_rejected() {
        let settings = HubSettings {
            max_message_length: 5,
            ..HubSettings::default()
        };
        let (hub, _store) = test_hub_with(settings);
        let mut a = TestClient::connect(&hub, "A").await;
        a.send(&hub, JOIN_R1).await;
        a.drain();

        a.send(&hub, &chat("too long")).await;
        assert_eq!(a.expect("error")["payload"]["code"], 1003);
    }

    /// Message store whose writes always fail.
    struct BrokenMessages;

    #[async_trait]
    impl MessageStore for BrokenMessages {
        async fn append(&self, _message: NewMessage) -> Result<StoredMessage, HubError> {
            Err(HubError::persistence("append message", "disk full"))
        }

        async fn get(&self, _id: MessageId) -> Result<Option<StoredMessage>, HubError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn failed_persistence_replies_error_and_skips_broadcast() {
        let store = Arc::new(MemoryStore::new());
        let mut collaborators = Collaborators::from_store(Arc::clone(&store));
        collaborators.messages = Arc::new(BrokenMessages);
        let hub = Hub::new(collaborators, HubSettings::default());

        let mut a = TestClient::connect(&hub, "A").await;
        let mut b = TestClient::connect(&hub, "B").await;
        a.send(&hub, JOIN_R1).await;
        b.send(&hub, JOIN_R1).await;
        a.drain();
        b.drain();

        a.send(&hub, &chat("lost")).await;
        let error = a.expect("error");
        assert_eq!(error["payload"]["code"], 4001);
        assert_eq!(error["payload"]["message"], "append message failed: disk full");
        assert!(b.drain().is_empty());
    }
}
