//! Helpers for driving a hub without a real transport.

#![allow(clippy::panic)]

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use super::{Hub, HubSettings, Session, router};
use crate::domain::connection::{ConnectionHandle, OutboundFrame};
use crate::domain::{Unregistered, UserId};
use crate::persistence::Collaborators;
use crate::persistence::memory::MemoryStore;

pub(crate) fn test_hub() -> (Arc<Hub>, Arc<MemoryStore>) {
    test_hub_with(HubSettings::default())
}

pub(crate) fn test_hub_with(settings: HubSettings) -> (Arc<Hub>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let hub = Hub::new(Collaborators::from_store(Arc::clone(&store)), settings);
    (hub, store)
}

/// A connected identity whose outbound frames are read straight from the
/// connection channel.
pub(crate) struct TestClient {
    pub(crate) session: Session,
    pub(crate) handle: ConnectionHandle,
    frames: mpsc::Receiver<OutboundFrame>,
}

impl TestClient {
    pub(crate) async fn connect(hub: &Arc<Hub>, user: &str) -> Self {
        let (handle, frames) = hub.connect(UserId::from(user)).await;
        Self {
            session: Session::from(&handle),
            handle,
            frames,
        }
    }

    pub(crate) async fn send(&self, hub: &Arc<Hub>, text: &str) {
        router::handle_text(hub, &self.session, text).await;
    }

    pub(crate) async fn disconnect(&self, hub: &Arc<Hub>) -> Unregistered {
        hub.disconnect(&self.session.user_id, self.session.connection_id)
            .await
    }

    /// Every queued frame, in order.
    pub(crate) fn frames(&mut self) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.frames.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Every queued envelope, in order; non-text frames are skipped.
    pub(crate) fn drain(&mut self) -> Vec<Value> {
        self.frames()
            .into_iter()
            .filter_map(|frame| match frame {
                OutboundFrame::Text(text) => serde_json::from_str(&text).ok(),
                OutboundFrame::Probe | OutboundFrame::Close { .. } => None,
            })
            .collect()
    }

    /// Discards envelopes until one of type `kind` arrives.
    pub(crate) fn expect(&mut self, kind: &str) -> Value {
        while let Ok(frame) = self.frames.try_recv() {
            if let OutboundFrame::Text(text) = frame
                && let Ok(value) = serde_json::from_str::<Value>(&text)
                && value["type"] == kind
            {
                return value;
            }
        }
        panic!("no `{kind}` envelope queued for {}", self.session.user_id);
    }

    /// Types of every queued envelope, in order.
    pub(crate) fn kinds(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .filter_map(|env| env["type"].as_str().map(str::to_string))
            .collect()
    }
}
