//! Hub error types with envelope, close-code, and HTTP status mapping.
//!
//! [`HubError`] is the central error type. Errors raised while handling an
//! inbound envelope become an `error` envelope addressed to the sender only;
//! authentication errors close the handshake with a distinguishing code;
//! errors from the diagnostics REST API map to an HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{MessageId, RoomId};

/// WebSocket close code sent when the handshake carries no credential.
pub const CLOSE_AUTH_REQUIRED: u16 = 4001;

/// WebSocket close code sent when the credential cannot be verified.
pub const CLOSE_AUTH_INVALID: u16 = 4003;

/// WebSocket close code sent when the liveness monitor evicts a connection.
pub const CLOSE_LIVENESS_TIMEOUT: u16 = 4008;

/// Structured JSON error response body for REST endpoints.
///
/// ```json
/// { "error": { "code": 3001, "message": "room not found: general" } }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see ranges on [`HubError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Coarse error category, used for logging and close decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, invalid, or expired credential at handshake.
    Authentication,
    /// Malformed or unrecognized envelope.
    Protocol,
    /// The sender may not perform the operation.
    Authorization,
    /// A referenced room or message does not exist.
    NotFound,
    /// A persistence or notification collaborator failed.
    Collaborator,
    /// The transport failed.
    Transport,
}

/// Hub error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category       | HTTP Status                 |
/// |-----------|----------------|-----------------------------|
/// | 1000–1999 | Protocol       | 400 Bad Request             |
/// | 2000–2999 | Authorization  | 401 Unauthorized / 403      |
/// | 3000–3999 | Not Found      | 404 Not Found               |
/// | 4000–4999 | Collaborator   | 500 / 502                   |
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Handshake carried no credential.
    #[error("authentication required")]
    MissingCredential,

    /// Credential could not be resolved to an identity.
    #[error("invalid token: {0}")]
    InvalidCredential(String),

    /// Inbound text is not a well-formed envelope.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Envelope `type` is not one the hub understands.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// Envelope is well-formed but its contents are invalid.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Sender is not a durable member of the room.
    #[error("not a member of room {0}")]
    NotRoomMember(RoomId),

    /// Sender has not joined the room on this connection's hub.
    #[error("not present in room {0}")]
    NotPresent(RoomId),

    /// Room exists but rejects the sender (e.g. private room).
    #[error("access denied to room {0}")]
    AccessDenied(RoomId),

    /// Room does not exist.
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),

    /// Message does not exist.
    #[error("message not found: {0}")]
    MessageNotFound(MessageId),

    /// A collaborator call failed.
    #[error("{operation} failed: {message}")]
    Persistence {
        /// Operation that failed (e.g. `"append message"`).
        operation: &'static str,
        /// Underlying error text.
        message: String,
    },

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HubError {
    /// Builds a [`HubError::Persistence`] for the named operation.
    pub fn persistence(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Persistence {
            operation,
            message: err.to_string(),
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential | Self::InvalidCredential(_) => ErrorKind::Authentication,
            Self::MalformedEnvelope(_) | Self::UnknownMessageType(_) | Self::InvalidPayload(_) => {
                ErrorKind::Protocol
            }
            Self::NotRoomMember(_) | Self::NotPresent(_) | Self::AccessDenied(_) => {
                ErrorKind::Authorization
            }
            Self::RoomNotFound(_) | Self::MessageNotFound(_) => ErrorKind::NotFound,
            Self::Persistence { .. } | Self::Internal(_) => ErrorKind::Collaborator,
            Self::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::MalformedEnvelope(_) => 1001,
            Self::UnknownMessageType(_) => 1002,
            Self::InvalidPayload(_) => 1003,
            Self::MissingCredential => 2001,
            Self::InvalidCredential(_) => 2002,
            Self::NotRoomMember(_) => 2003,
            Self::NotPresent(_) => 2004,
            Self::AccessDenied(_) => 2005,
            Self::RoomNotFound(_) => 3001,
            Self::MessageNotFound(_) => 3002,
            Self::Internal(_) => 4000,
            Self::Persistence { .. } => 4001,
            Self::Transport(_) => 4002,
        }
    }

    /// Returns the WebSocket close code for errors that end the handshake.
    #[must_use]
    pub const fn close_code(&self) -> Option<u16> {
        match self {
            Self::MissingCredential => Some(CLOSE_AUTH_REQUIRED),
            Self::InvalidCredential(_) => Some(CLOSE_AUTH_INVALID),
            _ => None,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedEnvelope(_) | Self::UnknownMessageType(_) | Self::InvalidPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::MissingCredential | Self::InvalidCredential(_) => StatusCode::UNAUTHORIZED,
            Self::NotRoomMember(_) | Self::NotPresent(_) | Self::AccessDenied(_) => {
                StatusCode::FORBIDDEN
            }
            Self::RoomNotFound(_) | Self::MessageNotFound(_) => StatusCode::NOT_FOUND,
            Self::Persistence { .. } | Self::Transport(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error body carried by `error` envelopes and responses.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.error_code(),
            message: self.to_string(),
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse { error: self.body() };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
