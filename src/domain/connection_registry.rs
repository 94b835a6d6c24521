//! Registry of live connections keyed by identity.
//!
//! [`ConnectionRegistry`] is a plain state holder; the hub wraps it in a
//! [`tokio::sync::RwLock`] so every mutation is single-writer.

use std::collections::HashMap;

use super::connection::ConnectionHandle;
use super::{ConnectionId, UserId};

/// Result of removing a connection from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unregistered {
    /// The connection was not registered (already torn down).
    Unknown,
    /// Removed; the identity still has this many connections.
    Remaining(usize),
    /// Removed the identity's last connection; it is now offline.
    WentOffline,
}

/// Identity → live connections.
///
/// # Invariant
///
/// An identity key exists iff its connection set is non-empty.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    by_user: HashMap<UserId, HashMap<ConnectionId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection under its owning identity.
    ///
    /// Registering the same connection twice is a no-op. Returns `true`
    /// when this is the identity's first connection.
    pub fn register(&mut self, handle: ConnectionHandle) -> bool {
        let conns = self.by_user.entry(handle.user_id().clone()).or_default();
        let first = conns.is_empty();
        conns.entry(handle.id()).or_insert(handle);
        first
    }

    /// Removes a connection, dropping the identity key with its last one.
    pub fn unregister(&mut self, user_id: &UserId, connection_id: ConnectionId) -> Unregistered {
        let Some(conns) = self.by_user.get_mut(user_id) else {
            return Unregistered::Unknown;
        };
        if conns.remove(&connection_id).is_none() {
            return Unregistered::Unknown;
        }
        if conns.is_empty() {
            self.by_user.remove(user_id);
            Unregistered::WentOffline
        } else {
            Unregistered::Remaining(conns.len())
        }
    }

    /// Returns every live connection of an identity.
    #[must_use]
    pub fn connections(&self, user_id: &UserId) -> Vec<ConnectionHandle> {
        self.by_user
            .get(user_id)
            .map(|conns| conns.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Looks up one connection.
    #[must_use]
    pub fn get(&self, user_id: &UserId, connection_id: ConnectionId) -> Option<&ConnectionHandle> {
        self.by_user.get(user_id)?.get(&connection_id)
    }

    /// Returns `true` if the identity has at least one connection.
    #[must_use]
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.by_user.contains_key(user_id)
    }

    /// Number of connections held by one identity.
    #[must_use]
    pub fn connection_count(&self, user_id: &UserId) -> usize {
        self.by_user.get(user_id).map_or(0, HashMap::len)
    }

    /// Every online identity, sorted.
    #[must_use]
    pub fn online_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.by_user.keys().cloned().collect();
        users.sort();
        users
    }

    /// Number of online identities.
    #[must_use]
    pub fn online_count(&self) -> usize {
        self.by_user.len()
    }

    /// Total number of open connections across all identities.
    #[must_use]
    pub fn total_connections(&self) -> usize {
        self.by_user.values().map(HashMap::len).sum()
    }

    /// Clones every connection handle, for probing outside the lock.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ConnectionHandle> {
        self.by_user
            .values()
            .flat_map(|conns| conns.values().cloned())
            .collect()
    }
}
