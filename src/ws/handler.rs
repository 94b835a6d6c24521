//! Axum WebSocket upgrade handler.
//!
//! The credential is resolved before the session is handed to the hub. A
//! handshake that fails authentication is still upgraded, but only so the
//! client can be told why: it receives a close frame carrying 4001
//! (missing credential) or 4003 (invalid credential) and nothing else.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use futures_util::SinkExt;
use serde::Deserialize;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::auth::AuthResolver;
use crate::domain::UserId;
use crate::error::HubError;

/// Handshake query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    /// Access token, for clients that cannot set headers.
    pub token: Option<String>,
}

/// `GET /ws` — Authenticate and upgrade to a hub session.
///
/// The credential is taken from `?token=` or an `Authorization: Bearer`
/// header, in that order.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let credential = params.token.or_else(|| bearer_token(&headers));
    let identity = authenticate(state.auth.as_ref(), credential.as_deref()).await;
    let hub = Arc::clone(&state.hub);

    ws.on_upgrade(move |socket| async move {
        match identity {
            Ok(user_id) => run_connection(socket, hub, user_id).await,
            Err(err) => reject(socket, &err).await,
        }
    })
}

async fn authenticate(
    auth: &dyn AuthResolver,
    credential: Option<&str>,
) -> Result<UserId, HubError> {
    let credential = credential
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(HubError::MissingCredential)?;
    auth.resolve(credential).await
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::to_string)
}

async fn reject(mut socket: WebSocket, err: &HubError) {
    let code = err.close_code().unwrap_or(crate::error::CLOSE_AUTH_INVALID);
    tracing::info!(code, error = %err, "rejecting unauthenticated handshake");
    let frame = CloseFrame {
        code,
        reason: err.to_string().into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
    let _ = socket.close().await;
}
