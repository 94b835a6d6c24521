//! # chat-hub
//!
//! Real-time messaging hub for a chat platform: authenticated WebSocket
//! sessions, room presence, typing indicators, and fan-out of chat events
//! to everyone in a room.
//!
//! Durable state (rooms, memberships, messages, reactions, read markers,
//! notifications) lives behind the collaborator traits in
//! [`persistence`]; the hub only keeps ephemeral state in memory.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, HTTP)
//!     │
//!     ├── WS Handler + Connection loop (ws/)
//!     ├── Diagnostics REST (api/)
//!     │
//!     ├── Hub (hub/): router, broadcast, liveness
//!     │     ├── ConnectionRegistry (domain/)
//!     │     ├── RoomPresence (domain/)
//!     │     └── TypingManager (domain/)
//!     │
//!     └── Collaborators (persistence/): PostgreSQL or in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod hub;
pub mod persistence;
pub mod ws;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the full HTTP application: REST, `/ws`, and (with the
/// `swagger-ui` feature) interactive API docs.
pub fn build_app(state: AppState) -> Router {
    let router = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws::handler::ws_handler));

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
        )
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
