//! WebSocket connection state machine.
//!
//! Each session runs two halves: a writer task draining the connection's
//! outbound channel into the socket, and a read loop dispatching inbound
//! envelopes to the hub router. Whichever half ends first ends the
//! session, and teardown always goes through [`Hub::disconnect`]. An
//! evicted connection is terminated out of band, so a full outbound
//! buffer cannot keep it open.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::UserId;
use crate::domain::connection::OutboundFrame;
use crate::error::{CLOSE_LIVENESS_TIMEOUT, HubError};
use crate::hub::{Hub, Session, router};

/// Upper bound on flushing a close frame to a peer that may be half-open.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Runs the read/write loop for one authenticated WebSocket connection.
pub async fn run_connection(socket: WebSocket, hub: Arc<Hub>, user_id: UserId) {
    let (ws_tx, mut ws_rx) = socket.split();
    let (handle, frames) = hub.connect(user_id).await;
    let session = Session::from(&handle);
    let mut writer = tokio::spawn(write_frames(ws_tx, frames, handle.termination_token()));

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        router::handle_text(&hub, &session, text.as_str()).await;
                    }
                    Some(Ok(Message::Pong(_))) => handle.mark_alive(),
                    Some(Ok(Message::Binary(_))) => {
                        let err = HubError::MalformedEnvelope("binary frames are not supported".to_string());
                        hub.send_error(&session.user_id, &err).await;
                    }
                    // Pings are answered by the transport.
                    Some(Ok(Message::Ping(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(connection_id = %session.connection_id, error = %err, "ws read failed");
                        break;
                    }
                }
            }
            _ = &mut writer => break,
            () = handle.terminated() => break,
        }
    }

    hub.disconnect(&session.user_id, session.connection_id).await;
    if handle.is_terminated() && !writer.is_finished() {
        // Let the writer try its close frame before the socket is dropped.
        let _ = tokio::time::timeout(CLOSE_GRACE, &mut writer).await;
    }
    drop(handle);
    writer.abort();
    tracing::debug!(
        user_id = %session.user_id,
        connection_id = %session.connection_id,
        "ws connection closed"
    );
}

/// Drains outbound frames into the socket until the channel closes, a
/// write fails, a close frame has been sent, or the connection is
/// terminated.
async fn write_frames(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut frames: mpsc::Receiver<OutboundFrame>,
    terminated: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            biased;
            () = terminated.cancelled() => break,
            frame = frames.recv() => frame,
        };
        let Some(frame) = frame else {
            return;
        };
        let (message, last) = match frame {
            OutboundFrame::Text(text) => (Message::text(text.to_string()), false),
            OutboundFrame::Probe => (Message::Ping(Default::default()), false),
            OutboundFrame::Close { code, reason } => (close_message(code, reason), true),
        };
        let sent = tokio::select! {
            () = terminated.cancelled() => break,
            sent = ws_tx.send(message) => sent,
        };
        if sent.is_err() || last {
            let _ = ws_tx.close().await;
            return;
        }
    }

    // Terminated: the queued close frame may never have fit in the buffer.
    let close = close_message(CLOSE_LIVENESS_TIMEOUT, "liveness timeout".to_string());
    let _ = tokio::time::timeout(CLOSE_GRACE, ws_tx.send(close)).await;
}

fn close_message(code: u16, reason: String) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}
