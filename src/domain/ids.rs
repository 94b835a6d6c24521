//! Type-safe identifiers for identities, rooms, messages, and connections.
//!
//! Identity and room ids are opaque strings owned by the surrounding
//! platform; the hub never parses them. Message and connection ids are
//! UUID v4 values so they cannot be confused with each other.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            #[must_use]
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Returns the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a new random id (UUID v4).
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Creates an id from an existing [`uuid::Uuid`].
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`uuid::Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

string_id!(
    /// Authenticated principal behind one or more connections.
    UserId
);

string_id!(
    /// Logical chat channel.
    RoomId
);

uuid_id!(
    /// Durable chat message identifier, assigned by the message store.
    MessageId
);

uuid_id!(
    /// One live transport session. Never persisted.
    ConnectionId
);

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn string_ids_order_lexically() {
        let mut ids = vec![UserId::from("b"), UserId::from("a"), UserId::from("c")];
        ids.sort();
        let raw: Vec<&str> = ids.iter().map(UserId::as_str).collect();
        assert_eq!(raw, vec!["a", "b", "c"]);
    }

    #[test]
    fn string_id_serializes_transparently() {
        let Ok(json) = serde_json::to_string(&RoomId::from("general")) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "\"general\"");
    }

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn message_id_parses_from_uuid_string() {
        let uuid = uuid::Uuid::new_v4();
        let json = format!("\"{uuid}\"");
        let Ok(id) = serde_json::from_str::<MessageId>(&json) else {
            panic!("deserialization failed");
        };
        assert_eq!(*id.as_uuid(), uuid);
    }
}
