//! PostgreSQL implementation of the persistence collaborators.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{
    MessageKind, NewMessage, Notification, Participant, Reaction, ReactionAction, ReactionToggle,
    RoomInfo, StoredMessage,
};
use super::{MembershipStore, MessageStore, NotificationSink, ReactionStore, ReadMarkerStore};
use crate::domain::{MessageId, RoomId, UserId};
use crate::error::HubError;

type RoomRow = (String, String, bool, i64, Option<DateTime<Utc>>, DateTime<Utc>);
type ParticipantRow = (String, DateTime<Utc>, Option<DateTime<Utc>>);
type MessageRow = (
    Uuid,
    String,
    String,
    String,
    String,
    Option<Uuid>,
    Vec<String>,
    DateTime<Utc>,
);
type ReactionRow = (Uuid, String, String, DateTime<Utc>);

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`HubError::Persistence`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), HubError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| HubError::persistence("run migrations", e))
    }
}

fn room_from_row(row: RoomRow) -> RoomInfo {
    let (id, name, is_private, participant_count, last_activity_at, created_at) = row;
    RoomInfo {
        id: RoomId::from(id),
        name,
        is_private,
        participant_count,
        last_activity_at,
        created_at,
    }
}

fn participant_from_row((user_id, joined_at, last_read_at): ParticipantRow) -> Participant {
    Participant {
        user_id: UserId::from(user_id),
        joined_at,
        last_read_at,
    }
}

fn message_from_row(row: MessageRow) -> Result<StoredMessage, HubError> {
    let (id, room_id, sender_id, content, kind, reply_to_id, media_urls, created_at) = row;
    let kind = kind
        .parse::<MessageKind>()
        .map_err(|e| HubError::persistence("load message", e))?;
    Ok(StoredMessage {
        id: MessageId::from_uuid(id),
        room_id: RoomId::from(room_id),
        sender_id: UserId::from(sender_id),
        content,
        kind,
        reply_to_id: reply_to_id.map(MessageId::from_uuid),
        media_urls,
        created_at,
    })
}

fn reaction_from_row((message_id, user_id, emoji, created_at): ReactionRow) -> Reaction {
    Reaction {
        message_id: MessageId::from_uuid(message_id),
        user_id: UserId::from(user_id),
        emoji,
        created_at,
    }
}

#[async_trait]
impl MembershipStore for PostgresStore {
    async fn ensure_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool, HubError> {
        const OP: &str = "ensure membership";
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| HubError::persistence(OP, e))?;

        // Row lock serializes concurrent first joins of the same room.
        let is_private =
            sqlx::query_scalar::<_, bool>("SELECT is_private FROM rooms WHERE id = $1 FOR UPDATE")
                .bind(room_id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| HubError::persistence(OP, e))?
                .ok_or_else(|| HubError::RoomNotFound(room_id.clone()))?;

        let already = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM room_participants WHERE room_id = $1 AND user_id = $2)",
        )
        .bind(room_id.as_str())
        .bind(user_id.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| HubError::persistence(OP, e))?;

        if already {
            return Ok(false);
        }
        if is_private {
            return Err(HubError::AccessDenied(room_id.clone()));
        }

        sqlx::query("INSERT INTO room_participants (room_id, user_id) VALUES ($1, $2)")
            .bind(room_id.as_str())
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| HubError::persistence(OP, e))?;

        sqlx::query("UPDATE rooms SET participant_count = participant_count + 1 WHERE id = $1")
            .bind(room_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| HubError::persistence(OP, e))?;

        tx.commit().await.map_err(|e| HubError::persistence(OP, e))?;
        Ok(true)
    }

    async fn member(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<Option<Participant>, HubError> {
        let row = sqlx::query_as::<_, ParticipantRow>(
            "SELECT user_id, joined_at, last_read_at FROM room_participants \
             WHERE room_id = $1 AND user_id = $2",
        )
        .bind(room_id.as_str())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| HubError::persistence("load membership", e))?;

        Ok(row.map(participant_from_row))
    }

    async fn list_members(&self, room_id: &RoomId) -> Result<Vec<Participant>, HubError> {
        let rows = sqlx::query_as::<_, ParticipantRow>(
            "SELECT user_id, joined_at, last_read_at FROM room_participants \
             WHERE room_id = $1 ORDER BY joined_at ASC",
        )
        .bind(room_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HubError::persistence("list members", e))?;

        Ok(rows.into_iter().map(participant_from_row).collect())
    }

    async fn room(&self, room_id: &RoomId) -> Result<RoomInfo, HubError> {
        let row = sqlx::query_as::<_, RoomRow>(
            "SELECT id, name, is_private, participant_count, last_activity_at, created_at \
             FROM rooms WHERE id = $1",
        )
        .bind(room_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| HubError::persistence("load room", e))?;

        row.map(room_from_row)
            .ok_or_else(|| HubError::RoomNotFound(room_id.clone()))
    }

    async fn record_activity(&self, room_id: &RoomId, at: DateTime<Utc>) -> Result<(), HubError> {
        sqlx::query("UPDATE rooms SET last_activity_at = $2 WHERE id = $1")
            .bind(room_id.as_str())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| HubError::persistence("record room activity", e))?;
        Ok(())
    }
}

#[async_trait]
impl MessageStore for PostgresStore {
    async fn append(&self, message: NewMessage) -> Result<StoredMessage, HubError> {
        let row = sqlx::query_as::<_, MessageRow>(
            "INSERT INTO messages (id, room_id, sender_id, content, message_type, reply_to_id, media_urls) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, room_id, sender_id, content, message_type, reply_to_id, media_urls, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(message.room_id.as_str())
        .bind(message.sender_id.as_str())
        .bind(&message.content)
        .bind(message.kind.as_str())
        .bind(message.reply_to_id.map(|id| *id.as_uuid()))
        .bind(&message.media_urls)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| HubError::persistence("append message", e))?;

        message_from_row(row)
    }

    async fn get(&self, message_id: MessageId) -> Result<Option<StoredMessage>, HubError> {
        let row = sqlx::query_as::<_, MessageRow>(
            "SELECT id, room_id, sender_id, content, message_type, reply_to_id, media_urls, created_at \
             FROM messages WHERE id = $1",
        )
        .bind(*message_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| HubError::persistence("load message", e))?;

        row.map(message_from_row).transpose()
    }
}

#[async_trait]
impl ReactionStore for PostgresStore {
    async fn toggle(
        &self,
        message_id: MessageId,
        user_id: &UserId,
        emoji: &str,
    ) -> Result<ReactionToggle, HubError> {
        const OP: &str = "toggle reaction";
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| HubError::persistence(OP, e))?;

        let deleted = sqlx::query(
            "DELETE FROM message_reactions WHERE message_id = $1 AND user_id = $2 AND emoji = $3",
        )
        .bind(*message_id.as_uuid())
        .bind(user_id.as_str())
        .bind(emoji)
        .execute(&mut *tx)
        .await
        .map_err(|e| HubError::persistence(OP, e))?
        .rows_affected();

        let action = if deleted > 0 {
            ReactionAction::Removed
        } else {
            sqlx::query(
                "INSERT INTO message_reactions (message_id, user_id, emoji) VALUES ($1, $2, $3)",
            )
            .bind(*message_id.as_uuid())
            .bind(user_id.as_str())
            .bind(emoji)
            .execute(&mut *tx)
            .await
            .map_err(|e| HubError::persistence(OP, e))?;
            ReactionAction::Added
        };

        let rows = sqlx::query_as::<_, ReactionRow>(
            "SELECT message_id, user_id, emoji, created_at FROM message_reactions \
             WHERE message_id = $1 ORDER BY created_at ASC",
        )
        .bind(*message_id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| HubError::persistence(OP, e))?;

        tx.commit().await.map_err(|e| HubError::persistence(OP, e))?;

        Ok(ReactionToggle {
            action,
            reactions: rows.into_iter().map(reaction_from_row).collect(),
        })
    }
}

#[async_trait]
impl ReadMarkerStore for PostgresStore {
    async fn update(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), HubError> {
        sqlx::query(
            "UPDATE room_participants SET last_read_at = $3 WHERE room_id = $1 AND user_id = $2",
        )
        .bind(room_id.as_str())
        .bind(user_id.as_str())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| HubError::persistence("update read marker", e))?;
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for PostgresStore {
    async fn deliver(
        &self,
        user_id: &UserId,
        notification: &Notification,
    ) -> Result<(), HubError> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, kind, title, body, room_id, message_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(notification.id)
        .bind(user_id.as_str())
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(notification.room_id.as_ref().map(RoomId::as_str))
        .bind(notification.message_id.map(|id| *id.as_uuid()))
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| HubError::persistence("deliver notification", e))?;
        Ok(())
    }
}
