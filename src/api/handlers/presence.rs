//! Read-only presence lookups.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{RoomPresenceResponse, UserPresenceResponse};
use crate::app_state::AppState;
use crate::domain::{RoomId, UserId};

/// `GET /rooms/{room_id}/presence` — Identities present in a room.
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}/presence",
    tag = "Presence",
    summary = "Room presence",
    description = "Identities currently present in the room. Unknown or empty rooms report nobody.",
    params(("room_id" = String, Path, description = "Room id")),
    responses(
        (status = 200, description = "Room presence", body = RoomPresenceResponse),
    )
)]
pub async fn room_presence(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Json<RoomPresenceResponse> {
    let room_id = RoomId::from(room_id);
    let online_users = state.hub.room_members(&room_id).await;
    Json(RoomPresenceResponse {
        count: online_users.len(),
        room_id,
        online_users,
    })
}

/// `GET /users/{user_id}/presence` — Connection and room presence of an identity.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/presence",
    tag = "Presence",
    summary = "Identity presence",
    description = "Whether the identity is online, how many connections it holds, and which rooms it is present in.",
    params(("user_id" = String, Path, description = "Identity id")),
    responses(
        (status = 200, description = "Identity presence", body = UserPresenceResponse),
    )
)]
pub async fn user_presence(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<UserPresenceResponse> {
    let user_id = UserId::from(user_id);
    let connections = state.hub.connection_count(&user_id).await;
    let rooms = state.hub.rooms_of(&user_id).await;
    Json(UserPresenceResponse {
        online: connections > 0,
        connections,
        rooms,
        user_id,
    })
}

/// Presence routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rooms/{room_id}/presence", get(room_presence))
        .route("/users/{user_id}/presence", get(user_presence))
}
