//! REST API layer: read-only diagnostics over the hub.
//!
//! Resource endpoints are mounted under `/api/v1`; `/health` sits at the
//! root.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for the diagnostics endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "chat-hub", description = "Real-time messaging hub diagnostics"),
    paths(
        handlers::system::health_handler,
        handlers::system::stats_handler,
        handlers::presence::room_presence,
        handlers::presence::user_presence,
    ),
    components(schemas(
        handlers::system::HealthResponse,
        crate::hub::HubStats,
        dto::RoomPresenceResponse,
        dto::UserPresenceResponse,
        crate::error::ErrorResponse,
    )),
    tags(
        (name = "System", description = "Health and counters"),
        (name = "Presence", description = "Who is online and where"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}
