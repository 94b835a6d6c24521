//! Typing indicators with auto-expiry.
//!
//! Each (room, identity) pair moves Idle → Typing → Idle. A typing entry
//! holds a cancellable timer; refreshing the entry cancels the previous
//! timer before scheduling a new one. Entries carry a generation number
//! so a timer that has already fired can never clear a newer entry for
//! the same key.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{RoomId, UserId};

/// Default window after the last typing signal before auto-stop.
pub const DEFAULT_TYPING_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to a scheduled one-shot callback.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Runs `callback` after `delay` on the tokio runtime.
    pub fn schedule<F>(delay: Duration, callback: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback.await;
        });
        Self { task }
    }

    /// Cancels the callback if it has not run yet.
    pub fn cancel(self) {
        self.task.abort();
    }

    /// Returns `true` once the callback has run or was cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

type TypingKey = (RoomId, UserId);

#[derive(Debug)]
struct TypingEntry {
    generation: u64,
    timer: TimerHandle,
}

/// Per (room, identity) typing state.
#[derive(Debug)]
pub struct TypingManager {
    entries: Mutex<HashMap<TypingKey, TypingEntry>>,
    next_generation: AtomicU64,
    timeout: Duration,
}

impl TypingManager {
    /// Creates a manager whose indicators expire after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
            timeout,
        })
    }

    /// Expiry window.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Enters or refreshes the Typing state.
    ///
    /// Any pending timer for the key is cancelled and `on_expire` is
    /// scheduled to run once the window elapses without a further `start`
    /// or `stop`. Returns `true` on the Idle → Typing transition.
    ///
    /// `on_expire` runs while the manager is locked and must not call back
    /// into it.
    pub async fn start<F, Fut>(
        self: &Arc<Self>,
        room_id: &RoomId,
        user_id: &UserId,
        on_expire: F,
    ) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let key = (room_id.clone(), user_id.clone());
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let manager: Weak<Self> = Arc::downgrade(self);
        let timer_key = key.clone();

        // Scheduled under the lock so the timer cannot observe the map
        // before its own entry is inserted.
        let mut entries = self.entries.lock().await;
        let timer = TimerHandle::schedule(self.timeout, async move {
            let Some(manager) = manager.upgrade() else {
                return;
            };
            // Held through `on_expire` so a concurrent `start` for the same
            // key is ordered after the expiry's own notification.
            let mut entries = manager.entries.lock().await;
            if entries
                .get(&timer_key)
                .is_some_and(|entry| entry.generation == generation)
            {
                entries.remove(&timer_key);
                on_expire().await;
            }
        });
        match entries.insert(key, TypingEntry { generation, timer }) {
            Some(previous) => {
                previous.timer.cancel();
                false
            }
            None => true,
        }
    }

    /// Leaves the Typing state. Returns `false` if the key was already Idle.
    pub async fn stop(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        let key = (room_id.clone(), user_id.clone());
        let removed = self.entries.lock().await.remove(&key);
        removed.map(|entry| entry.timer.cancel()).is_some()
    }

    /// Clears every typing entry of an identity, returning the affected rooms.
    pub async fn stop_all(&self, user_id: &UserId) -> Vec<RoomId> {
        let mut entries = self.entries.lock().await;
        let keys: Vec<TypingKey> = entries
            .keys()
            .filter(|(_, user)| user == user_id)
            .cloned()
            .collect();
        let mut rooms = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = entries.remove(&key) {
                entry.timer.cancel();
                rooms.push(key.0);
            }
        }
        rooms.sort();
        rooms
    }

    /// Returns `true` while the identity is typing in the room.
    pub async fn is_typing(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        let key = (room_id.clone(), user_id.clone());
        self.entries.lock().await.contains_key(&key)
    }

    /// Number of active typing entries.
    pub async fn active_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}
