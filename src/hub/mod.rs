//! The messaging hub: owns the connection registry, room presence, and
//! typing state, and coordinates them for the router and the liveness
//! monitor.
//!
//! A single [`Hub`] value is built per process and shared as `Arc<Hub>`.
//! Tests build isolated hubs over a [`crate::persistence::memory::MemoryStore`].
//!
//! # Locking
//!
//! The registry and presence tracker each sit behind their own
//! [`RwLock`]. When both are needed (teardown) the registry is locked
//! first. No lock is held across a collaborator call or a channel write.

pub mod broadcast;
pub mod liveness;
pub mod router;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{RwLock, mpsc};
use utoipa::ToSchema;

use crate::config::HubConfig;
use crate::domain::connection::{ConnectionHandle, OutboundFrame};
use crate::domain::typing::{DEFAULT_TYPING_TIMEOUT, TypingManager};
use crate::domain::{
    ConnectionId, ConnectionRegistry, RoomId, RoomPresence, Unregistered, UserId,
};
use crate::error::{CLOSE_LIVENESS_TIMEOUT, HubError};
use crate::persistence::Collaborators;
use crate::ws::messages::ServerEvent;

pub use router::Session;

/// Tunables for a hub instance.
#[derive(Debug, Clone)]
pub struct HubSettings {
    /// Period of the liveness monitor.
    pub heartbeat_interval: Duration,
    /// Typing indicator expiry window.
    pub typing_timeout: Duration,
    /// Per-connection outbound buffer, in frames.
    pub outbound_buffer: usize,
    /// Maximum chat message length, in characters.
    pub max_message_length: usize,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            typing_timeout: DEFAULT_TYPING_TIMEOUT,
            outbound_buffer: 256,
            max_message_length: 4000,
        }
    }
}

impl From<&HubConfig> for HubSettings {
    fn from(config: &HubConfig) -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(config.heartbeat_interval_secs),
            typing_timeout: Duration::from_secs(config.typing_timeout_secs),
            outbound_buffer: config.outbound_buffer,
            max_message_length: config.max_message_length,
        }
    }
}

/// Point-in-time counters for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct HubStats {
    /// Identities with at least one connection.
    pub online_users: usize,
    /// Open connections.
    pub connections: usize,
    /// Rooms with at least one present identity.
    pub active_rooms: usize,
    /// Active typing indicators.
    pub typing_indicators: usize,
}

/// Real-time messaging hub.
#[derive(Debug)]
pub struct Hub {
    connections: RwLock<ConnectionRegistry>,
    presence: RwLock<RoomPresence>,
    typing: Arc<TypingManager>,
    collaborators: Collaborators,
    settings: HubSettings,
}

impl Hub {
    /// Creates a hub with empty registries.
    #[must_use]
    pub fn new(collaborators: Collaborators, settings: HubSettings) -> Arc<Self> {
        Arc::new(Self {
            connections: RwLock::new(ConnectionRegistry::new()),
            presence: RwLock::new(RoomPresence::new()),
            typing: TypingManager::new(settings.typing_timeout),
            collaborators,
            settings,
        })
    }

    /// Persistence collaborators.
    #[must_use]
    pub const fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Hub tunables.
    #[must_use]
    pub const fn settings(&self) -> &HubSettings {
        &self.settings
    }

    /// Registers a freshly authenticated connection and confirms it.
    ///
    /// Returns the connection handle and the receiver its writer task
    /// drains.
    pub async fn connect(
        &self,
        user_id: UserId,
    ) -> (ConnectionHandle, mpsc::Receiver<OutboundFrame>) {
        let (handle, frames) = ConnectionHandle::new(user_id, self.settings.outbound_buffer);
        let first = self.connections.write().await.register(handle.clone());
        tracing::info!(
            user_id = %handle.user_id(),
            connection_id = %handle.id(),
            first_connection = first,
            "connection registered"
        );
        self.send_to_connection(
            &handle,
            ServerEvent::Connected {
                user_id: handle.user_id().clone(),
                connection_id: handle.id(),
                heartbeat_interval_secs: self.settings.heartbeat_interval.as_secs(),
            },
        );
        (handle, frames)
    }

    /// Tears down a connection.
    ///
    /// Safe to call more than once for the same connection; only the first
    /// call has an effect. When the identity's last connection goes, it
    /// leaves every room it was present in, its typing indicators stop, and
    /// each of those rooms receives exactly one `user_offline`.
    pub async fn disconnect(&self, user_id: &UserId, connection_id: ConnectionId) -> Unregistered {
        let (outcome, rooms) = {
            let mut connections = self.connections.write().await;
            let outcome = connections.unregister(user_id, connection_id);
            let rooms = if outcome == Unregistered::WentOffline {
                self.presence.write().await.leave_all(user_id)
            } else {
                Vec::new()
            };
            (outcome, rooms)
        };

        match outcome {
            Unregistered::Unknown => {}
            Unregistered::Remaining(remaining) => {
                tracing::debug!(%user_id, %connection_id, remaining, "connection closed");
            }
            Unregistered::WentOffline => {
                for room_id in self.typing.stop_all(user_id).await {
                    self.broadcast_to_room(
                        &room_id,
                        ServerEvent::TypingStop {
                            room_id: room_id.clone(),
                            user_id: user_id.clone(),
                        },
                        Some(user_id),
                    )
                    .await;
                }
                for room_id in &rooms {
                    self.broadcast_to_room(
                        room_id,
                        ServerEvent::UserOffline {
                            room_id: room_id.clone(),
                            user_id: user_id.clone(),
                        },
                        None,
                    )
                    .await;
                }
                tracing::info!(%user_id, %connection_id, rooms = rooms.len(), "identity offline");
            }
        }
        outcome
    }

    /// Forcibly closes a connection and tears it down.
    ///
    /// The close frame is best-effort; termination does not depend on
    /// outbound buffer space.
    pub async fn evict(&self, handle: &ConnectionHandle) -> Unregistered {
        let close = handle.deliver(OutboundFrame::Close {
            code: CLOSE_LIVENESS_TIMEOUT,
            reason: "liveness timeout".to_string(),
        });
        handle.terminate();
        tracing::warn!(
            user_id = %handle.user_id(),
            connection_id = %handle.id(),
            close_frame = ?close,
            "evicting unresponsive connection"
        );
        self.disconnect(handle.user_id(), handle.id()).await
    }

    /// Returns `true` while the connection is registered.
    pub async fn is_registered(&self, user_id: &UserId, connection_id: ConnectionId) -> bool {
        self.connections
            .read()
            .await
            .get(user_id, connection_id)
            .is_some()
    }

    /// Marks one connection alive (peer answered a probe).
    pub async fn mark_alive(&self, user_id: &UserId, connection_id: ConnectionId) {
        if let Some(handle) = self.connections.read().await.get(user_id, connection_id) {
            handle.mark_alive();
        }
    }

    /// Enters or refreshes the Typing state and tells the room.
    ///
    /// The expiry callback holds only a weak reference so a pending timer
    /// never keeps the hub alive.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotPresent`] if the identity is not present in
    /// the room.
    pub(crate) async fn start_typing(
        self: &Arc<Self>,
        session: &Session,
        room_id: &RoomId,
    ) -> Result<(), HubError> {
        let user_id = &session.user_id;
        if !self.is_present(room_id, user_id).await {
            return Err(HubError::NotPresent(room_id.clone()));
        }
        let hub = Arc::downgrade(self);
        let (expired_room, expired_user) = (room_id.clone(), user_id.clone());
        self.typing
            .start(room_id, user_id, move || async move {
                let Some(hub) = hub.upgrade() else {
                    return;
                };
                tracing::debug!(room_id = %expired_room, user_id = %expired_user, "typing expired");
                hub.broadcast_to_room(
                    &expired_room,
                    ServerEvent::TypingStop {
                        room_id: expired_room.clone(),
                        user_id: expired_user.clone(),
                    },
                    Some(&expired_user),
                )
                .await;
            })
            .await;

        // Teardown clears typing after unregistering; an entry inserted
        // after that must be undone here.
        if !self.is_registered(user_id, session.connection_id).await
            || !self.is_present(room_id, user_id).await
        {
            self.typing.stop(room_id, user_id).await;
            return Ok(());
        }
        self.broadcast_to_room(
            room_id,
            ServerEvent::TypingStart {
                room_id: room_id.clone(),
                user_id: user_id.clone(),
            },
            Some(user_id),
        )
        .await;
        Ok(())
    }

    /// Leaves the Typing state, telling the room only if the identity was
    /// typing.
    pub(crate) async fn stop_typing(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        if !self.typing.stop(room_id, user_id).await {
            return false;
        }
        self.broadcast_to_room(
            room_id,
            ServerEvent::TypingStop {
                room_id: room_id.clone(),
                user_id: user_id.clone(),
            },
            Some(user_id),
        )
        .await;
        true
    }

    /// Returns `true` if the identity has at least one connection.
    pub async fn is_online(&self, user_id: &UserId) -> bool {
        self.connections.read().await.is_online(user_id)
    }

    /// Number of open connections held by an identity.
    pub async fn connection_count(&self, user_id: &UserId) -> usize {
        self.connections.read().await.connection_count(user_id)
    }

    /// Identities present in a room, sorted.
    pub async fn room_members(&self, room_id: &RoomId) -> Vec<UserId> {
        self.presence.read().await.members(room_id)
    }

    /// Returns `true` if the identity is present in the room.
    pub async fn is_present(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        self.presence.read().await.is_member(room_id, user_id)
    }

    /// Rooms an identity is present in, sorted.
    pub async fn rooms_of(&self, user_id: &UserId) -> Vec<RoomId> {
        self.presence.read().await.rooms_of(user_id)
    }

    /// Returns `true` while the identity is typing in the room.
    pub async fn is_typing(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        self.typing.is_typing(room_id, user_id).await
    }

    /// Current counters.
    pub async fn stats(&self) -> HubStats {
        let (online_users, connections) = {
            let registry = self.connections.read().await;
            (registry.online_count(), registry.total_connections())
        };
        let active_rooms = self.presence.read().await.room_count();
        HubStats {
            online_users,
            connections,
            active_rooms,
            typing_indicators: self.typing.active_count().await,
        }
    }
}
