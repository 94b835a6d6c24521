//! Live connection handle shared between the registry and the socket
//! writer task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{ConnectionId, UserId};

/// A frame queued for the socket writer task of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Serialized JSON envelope, shared across every recipient of a fan-out.
    Text(Arc<str>),
    /// Transport-level liveness probe (WebSocket ping).
    Probe,
    /// Close the transport with the given code and reason.
    Close {
        /// WebSocket close code.
        code: u16,
        /// Human-readable close reason.
        reason: String,
    },
}

/// Outcome of queueing a frame on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Frame queued for the writer task.
    Queued,
    /// Outbound buffer full; frame dropped.
    Dropped,
    /// Writer task is gone; the connection is being torn down.
    Closed,
}

/// Handle to one authenticated transport session.
///
/// Cloning is cheap: clones share the same outbound channel and liveness
/// flag. The registry owns the canonical copy for the session's lifetime.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    user_id: UserId,
    sender: mpsc::Sender<OutboundFrame>,
    alive: Arc<AtomicBool>,
    terminated: CancellationToken,
    connected_at: DateTime<Utc>,
}

impl ConnectionHandle {
    /// Creates a handle for `user_id` with an outbound buffer of `capacity`
    /// frames, returning the receiving half for the writer task.
    #[must_use]
    pub fn new(user_id: UserId, capacity: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: ConnectionId::new(),
            user_id,
            sender,
            alive: Arc::new(AtomicBool::new(true)),
            terminated: CancellationToken::new(),
            connected_at: Utc::now(),
        };
        (handle, receiver)
    }

    /// Connection identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Identity that owns this connection.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// When the handshake completed.
    #[must_use]
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Queues a frame without waiting for buffer space.
    pub fn deliver(&self, frame: OutboundFrame) -> Delivery {
        match self.sender.try_send(frame) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    connection_id = %self.id,
                    user_id = %self.user_id,
                    "outbound buffer full, dropping frame"
                );
                Delivery::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Records that the peer answered a probe.
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Release);
    }

    /// Clears the liveness flag, returning whether a pong was seen since
    /// the previous call.
    pub fn take_alive(&self) -> bool {
        self.alive.swap(false, Ordering::AcqRel)
    }

    /// Forces the transport closed regardless of outbound buffer space.
    pub fn terminate(&self) {
        self.terminated.cancel();
    }

    /// Returns `true` once [`ConnectionHandle::terminate`] has been called.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated.is_cancelled()
    }

    /// Token cancelled on termination, for tasks that must not hold a
    /// sender clone.
    #[must_use]
    pub fn termination_token(&self) -> CancellationToken {
        self.terminated.clone()
    }

    /// Completes when the connection is terminated.
    pub async fn terminated(&self) {
        self.terminated.cancelled().await;
    }

    /// Returns `true` once the writer task has dropped its receiver.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn liveness_flag_starts_set_and_clears_on_take() {
        let (handle, _rx) = ConnectionHandle::new(UserId::from("a"), 4);
        assert!(handle.take_alive());
        assert!(!handle.take_alive());
        handle.mark_alive();
        assert!(handle.take_alive());
    }

    #[test]
    fn clones_share_liveness_flag() {
        let (handle, _rx) = ConnectionHandle::new(UserId::from("a"), 4);
        let clone = handle.clone();
        let _ = handle.take_alive();
        clone.mark_alive();
        assert!(handle.take_alive());
    }

    #[test]
    fn full_buffer_drops_frame() {
        let (handle, _rx) = ConnectionHandle::new(UserId::from("a"), 1);
        assert_eq!(handle.deliver(OutboundFrame::Probe), Delivery::Queued);
        assert_eq!(handle.deliver(OutboundFrame::Probe), Delivery::Dropped);
    }

    #[test]
    fn dropped_receiver_reports_closed() {
        let (handle, rx) = ConnectionHandle::new(UserId::from("a"), 1);
        drop(rx);
        assert!(handle.is_closed());
        assert_eq!(handle.deliver(OutboundFrame::Probe), Delivery::Closed);
    }

    #[tokio::test]
    async fn terminate_is_shared_by_clones() {
        let (handle, _rx) = ConnectionHandle::new(UserId::from("a"), 1);
        let clone = handle.clone();
        assert!(!clone.is_terminated());
        handle.terminate();
        assert!(clone.is_terminated());
        clone.terminated().await;
    }

    #[tokio::test]
    async fn queued_frame_reaches_receiver() {
        let (handle, mut rx) = ConnectionHandle::new(UserId::from("a"), 4);
        let text: Arc<str> = Arc::from("{}");
        let _ = handle.deliver(OutboundFrame::Text(Arc::clone(&text)));
        let Some(OutboundFrame::Text(received)) = rx.recv().await else {
            panic!("expected text frame");
        };
        assert_eq!(&*received, "{}");
    }
}
