use super::LogCollector;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Periodically checks for delivery timeouts so they are detected even when
/// no new records arrive.
pub fn spawn_timeout_sweeper(
    collector: Arc<LogCollector>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(period_ms = period.as_millis() as u64, "Timeout sweeper started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Timeout sweeper stopped");
                    break;
                }
                _ = interval.tick() => {
                    if collector.check_delivery_timeout() {
                        debug!("Sweeper detected a delivery timeout");
                    }
                }
            }
        }
    })
}
