//! Worker accept loop.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use matchgrid_scheduler::Scheduler;

use crate::connection::serve_worker;

/// Accept worker connections until shutdown is signalled.
///
/// Each connection runs on its own task; a failed accept is logged and
/// the loop keeps going.
pub async fn run_worker_listener(
    scheduler: Arc<Scheduler>,
    listener: TcpListener,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let scheduler = scheduler.clone();
                        tokio::spawn(async move {
                            serve_worker(scheduler, stream, peer.to_string()).await;
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to accept worker connection");
                    }
                }
            }
            _ = shutdown.changed() => {
                info!("worker listener shutting down");
                break;
            }
        }
    }
}
