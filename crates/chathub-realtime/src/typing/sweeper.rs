//! Background typing-expiry sweep task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use crate::relay::ChatRelay;

/// Runs the periodic typing-expiry sweep until shutdown is signalled.
///
/// Ticks at the configured cadence (1000 ms by default) and lets the relay
/// expire stale entries and broadcast typing-stopped. Runs independently of
/// any per-connection task but shares the same store discipline through the
/// relay.
pub async fn run_typing_sweep(relay: Arc<ChatRelay>, mut shutdown: watch::Receiver<bool>) {
    let cadence = Duration::from_millis(relay.config().typing_sweep_interval_ms);
    let mut ticker = time::interval(cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => relay.sweep_typing(),
            _ = shutdown.changed() => break,
        }
    }

    debug!("Typing sweep task stopped");
}
