//! Presence snapshots exposed over REST.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{RoomId, UserId};

/// Who is present in a room right now.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomPresenceResponse {
    /// The room.
    pub room_id: RoomId,
    /// Present identities, sorted.
    pub online_users: Vec<UserId>,
    /// Number of present identities.
    pub count: usize,
}

/// Connection and room presence of one identity.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserPresenceResponse {
    /// The identity.
    pub user_id: UserId,
    /// `true` while at least one connection is open.
    pub online: bool,
    /// Open connections.
    pub connections: usize,
    /// Rooms the identity is present in, sorted.
    pub rooms: Vec<RoomId>,
}
