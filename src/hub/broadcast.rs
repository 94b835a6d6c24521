//! Fan-out of outbound envelopes to connections.
//!
//! Recipients are snapshotted under a read lock; the envelope is
//! serialized once and queued on each connection after the lock is gone.
//! Nothing here touches persistence.

use crate::domain::connection::{ConnectionHandle, Delivery, OutboundFrame};
use crate::domain::{RoomId, UserId};
use crate::error::HubError;
use crate::persistence::models::Notification;
use crate::ws::messages::{OutboundEnvelope, ServerEvent};

use super::Hub;

impl Hub {
    /// Delivers to every live connection of one identity.
    ///
    /// An offline identity is not an error; nothing is sent. Returns the
    /// number of connections the envelope was queued on.
    pub async fn send_to_identity(
        &self,
        user_id: &UserId,
        envelope: impl Into<OutboundEnvelope>,
    ) -> usize {
        let recipients = self.connections.read().await.connections(user_id);
        deliver(&envelope.into(), &recipients)
    }

    /// Delivers to a single connection.
    pub fn send_to_connection(
        &self,
        handle: &ConnectionHandle,
        envelope: impl Into<OutboundEnvelope>,
    ) -> usize {
        deliver(&envelope.into(), std::slice::from_ref(handle))
    }

    /// Delivers to every identity present in a room, optionally skipping one.
    pub async fn broadcast_to_room(
        &self,
        room_id: &RoomId,
        envelope: impl Into<OutboundEnvelope>,
        exclude: Option<&UserId>,
    ) -> usize {
        let members = self.presence.read().await.members(room_id);
        let recipients: Vec<ConnectionHandle> = {
            let connections = self.connections.read().await;
            members
                .iter()
                .filter(|member| Some(*member) != exclude)
                .flat_map(|member| connections.connections(member))
                .collect()
        };
        deliver(&envelope.into(), &recipients)
    }

    /// Delivers to every connected identity, optionally skipping one.
    pub async fn broadcast_all(
        &self,
        envelope: impl Into<OutboundEnvelope>,
        exclude: Option<&UserId>,
    ) -> usize {
        let recipients: Vec<ConnectionHandle> = self
            .connections
            .read()
            .await
            .snapshot()
            .into_iter()
            .filter(|handle| Some(handle.user_id()) != exclude)
            .collect();
        deliver(&envelope.into(), &recipients)
    }

    /// Sends an `error` envelope to the originating identity only.
    pub async fn send_error(&self, user_id: &UserId, err: &HubError) -> usize {
        self.send_to_identity(user_id, ServerEvent::from(err)).await
    }

    /// Stores a notification and pushes it live if the identity is online.
    ///
    /// # Errors
    ///
    /// Returns the notification sink's error; nothing is pushed in that case.
    pub async fn notify(
        &self,
        user_id: &UserId,
        notification: Notification,
    ) -> Result<usize, HubError> {
        self.collaborators
            .notifications
            .deliver(user_id, &notification)
            .await?;
        Ok(self
            .send_to_identity(user_id, ServerEvent::Notification { notification })
            .await)
    }

    /// Pushes a platform-wide notification to every connected identity.
    pub async fn announce(&self, notification: Notification) -> usize {
        tracing::info!(title = %notification.title, "broadcasting announcement");
        self.broadcast_all(ServerEvent::Notification { notification }, None)
            .await
    }
}

fn deliver(envelope: &OutboundEnvelope, recipients: &[ConnectionHandle]) -> usize {
    if recipients.is_empty() {
        return 0;
    }
    let text = match envelope.to_frame_text() {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(error = %err, "dropping unserializable envelope");
            return 0;
        }
    };
    recipients
        .iter()
        .filter(|handle| {
            handle.deliver(OutboundFrame::Text(std::sync::Arc::clone(&text))) == Delivery::Queued
        })
        .count()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::super::test_support::{TestClient, test_hub};
    use super::*;

    #[tokio::test]
    async fn offline_identity_is_a_silent_noop() {
        let (hub, _store) = test_hub();
        let sent = hub
            .send_to_identity(&UserId::from("ghost"), ServerEvent::Pong)
            .await;
        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn identity_delivery_reaches_every_device() {
        let (hub, _store) = test_hub();
        let mut phone = TestClient::connect(&hub, "a").await;
        let mut laptop = TestClient::connect(&hub, "a").await;
        phone.drain();
        laptop.drain();

        let sent = hub
            .send_to_identity(&UserId::from("a"), ServerEvent::Pong)
            .await;
        assert_eq!(sent, 2);
        assert_eq!(phone.kinds(), vec!["pong"]);
        assert_eq!(laptop.kinds(), vec!["pong"]);
    }

    #[tokio::test]
    async fn room_broadcast_honours_exclusion_and_presence() {
        let (hub, _store) = test_hub();
        let a = TestClient::connect(&hub, "a").await;
        let mut b = TestClient::connect(&hub, "b").await;
        let mut outsider = TestClient::connect(&hub, "c").await;
        a.send(&hub, r#"{"type":"join_room","roomId":"r1"}"#).await;
        b.send(&hub, r#"{"type":"join_room","roomId":"r1"}"#).await;
        b.drain();
        outsider.drain();

        let room = crate::domain::RoomId::from("r1");
        let sent = hub
            .broadcast_to_room(&room, ServerEvent::Pong, Some(&UserId::from("a")))
            .await;
        assert_eq!(sent, 1);
        assert_eq!(b.kinds(), vec!["pong"]);
        assert!(outsider.drain().is_empty());
    }

    #[tokio::test]
    async fn announce_reaches_everyone() {
        let (hub, _store) = test_hub();
        let mut a = TestClient::connect(&hub, "a").await;
        let mut b = TestClient::connect(&hub, "b").await;
        a.drain();
        b.drain();

        let sent = hub
            .announce(Notification::announcement("Maintenance", "Back in 5"))
            .await;
        assert_eq!(sent, 2);
        let note = a.expect("notification");
        assert_eq!(note["payload"]["notification"]["kind"], "announcement");
        assert_eq!(b.kinds(), vec!["notification"]);
    }

    #[tokio::test]
    async fn notify_stores_and_pushes() {
        let (hub, store) = test_hub();
        let mut a = TestClient::connect(&hub, "a").await;
        a.drain();

        let user = UserId::from("a");
        let result = hub
            .notify(&user, Notification::announcement("Hello", "World"))
            .await;
        assert!(matches!(result, Ok(1)));
        assert_eq!(store.notifications_for(&user).await.len(), 1);
        assert_eq!(a.kinds(), vec!["notification"]);
    }
}
