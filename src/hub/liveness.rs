//! Liveness monitor.
//!
//! Every heartbeat interval each connection is checked: one that answered
//! since the previous sweep gets a fresh probe, one that stayed silent is
//! evicted with close code 4008. A dead peer is therefore gone within two
//! intervals.
//!
//! # Graceful Shutdown
//!
//! [`start_liveness_monitor`] exits when its cancellation token fires.

use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::domain::connection::{Delivery, OutboundFrame};

use super::Hub;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Connections sent a fresh probe.
    pub probed: usize,
    /// Connections evicted for missing the previous probe.
    pub evicted: usize,
}

/// Probes live connections and evicts silent ones.
pub async fn sweep(hub: &Hub) -> SweepReport {
    let snapshot = hub.connections.read().await.snapshot();
    let mut report = SweepReport::default();
    for handle in snapshot {
        if handle.take_alive() && handle.deliver(OutboundFrame::Probe) != Delivery::Closed {
            report.probed += 1;
        } else {
            hub.evict(&handle).await;
            report.evicted += 1;
        }
    }
    report
}

/// Runs [`sweep`] every heartbeat interval until cancelled.
#[instrument(skip_all, name = "hub.task.liveness")]
pub async fn start_liveness_monitor(hub: Arc<Hub>, cancel_token: CancellationToken) {
    let period = hub.settings.heartbeat_interval;
    info!(interval_secs = period.as_secs(), "starting liveness monitor");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = sweep(&hub).await;
                if report.evicted > 0 {
                    tracing::warn!(
                        probed = report.probed,
                        evicted = report.evicted,
                        "evicted unresponsive connections"
                    );
                } else {
                    tracing::trace!(probed = report.probed, "liveness sweep");
                }
            }
            () = cancel_token.cancelled() => {
                info!("liveness monitor received shutdown signal, exiting");
                break;
            }
        }
    }
}
