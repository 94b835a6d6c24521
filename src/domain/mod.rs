//! Domain layer: identifiers, connection bookkeeping, room presence, and
//! typing state.
//!
//! These types hold no locks of their own (except the typing manager,
//! which owns its timers); the hub decides how they are shared.

pub mod connection;
pub mod connection_registry;
pub mod ids;
pub mod room_presence;
pub mod typing;

pub use connection::ConnectionHandle;
pub use connection_registry::{ConnectionRegistry, Unregistered};
pub use ids::{ConnectionId, MessageId, RoomId, UserId};
pub use room_presence::RoomPresence;
pub use typing::TypingManager;
