//! WebSocket broadcast functionality.
//!
//! The broadcaster checks the console state version at a fixed interval and
//! pushes a full update to all connected clients only when it changed.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::state::DashboardState;
use crate::types::DashboardMessage;

/// Run the broadcaster task until `shutdown` is cancelled.
pub async fn run_broadcaster(
    state: DashboardState,
    tx: broadcast::Sender<String>,
    interval_ms: u64,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
    let mut last_version = state.version();

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                debug!("Broadcaster stopped");
                return;
            }
            _ = interval.tick() => {}
        }

        let version = state.version();
        if version == last_version {
            continue;
        }
        last_version = version;

        let msg = DashboardMessage::Update(state.collect_snapshot());
        match serde_json::to_string(&msg) {
            Ok(json) => match tx.send(json) {
                Ok(n) => trace!(receivers = n, version, "Broadcast update sent"),
                // No receivers - normal when no clients are connected
                Err(_) => trace!("No WebSocket receivers connected"),
            },
            Err(e) => debug!(error = %e, "Failed to serialize dashboard update"),
        }
    }
}
