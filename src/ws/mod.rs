//! WebSocket layer: handshake, per-connection read/write loop, and the
//! envelope wire format.
//!
//! The endpoint at `/ws` authenticates during the upgrade and then hands
//! each session to the [`crate::hub::Hub`].

pub mod connection;
pub mod handler;
pub mod messages;
