//! Periodic execution of the dispatch cycle.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::cycle::QueueDispatcher;

/// Run a dispatch cycle every `interval` until `cancel` is triggered.
///
/// A failed cycle is logged and retried on the next tick. A cycle in
/// progress is allowed to finish before shutdown.
pub async fn run(dispatcher: Arc<QueueDispatcher>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        interval_secs = interval.as_secs(),
        "Queue dispatcher started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Queue dispatcher shutting down");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = dispatcher.run_cycle(Utc::now()).await {
                    tracing::error!(error = %e, "Dispatch cycle failed");
                }
            }
        }
    }
}
