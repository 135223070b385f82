//! Background tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use matchgrid_scheduler::Scheduler;

/// Periodically fold newly discovered map files into the catalog.
///
/// Polling, not event-driven: the maps directory is rescanned every
/// `interval`, and the scan itself is mtime-guarded so unchanged
/// directories cost one stat call.
pub async fn run_map_rescan(
    scheduler: Arc<Scheduler>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = scheduler.rescan_maps() {
                    error!(error = %e, "map rescan failed");
                }
            }
            _ = shutdown.changed() => {
                info!("map rescan loop shutting down");
                break;
            }
        }
    }
}
