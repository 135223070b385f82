//! Per-worker connection handling.
//!
//! Each accepted socket gets one task running `serve_worker`: a writer
//! task drains the scheduler's outbound queue to the socket, while the
//! read loop translates inbound frames into scheduler calls. The
//! scheduler is never blocked on the network in either direction.

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use matchgrid_proto::{FromWorker, ProtoError, ToWorker, read_frame, write_frame};
use matchgrid_scheduler::{Scheduler, WorkerId};

/// Drive one worker connection until it closes or faults.
///
/// Registers the worker with the scheduler on entry and deregisters it
/// on any exit path; a socket fault is treated as a disconnect, nothing
/// more.
pub async fn serve_worker(scheduler: Arc<Scheduler>, stream: TcpStream, addr: String) {
    let (mut reader, mut writer) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ToWorker>();
    let worker_id = scheduler.worker_connected(addr, tx);

    let writer_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = write_frame(&mut writer, &msg).await {
                warn!(error = %e, "worker write failed; closing send path");
                break;
            }
        }
    });

    loop {
        match read_frame::<FromWorker, _>(&mut reader).await {
            Ok(Some(msg)) => handle_message(&scheduler, worker_id, msg),
            Ok(None) => {
                info!(worker = worker_id, "worker closed connection");
                break;
            }
            // A malformed body leaves the frame boundary intact: log
            // and keep reading, the protocol does not force a
            // disconnect on bad messages.
            Err(ProtoError::Decode(e)) => {
                warn!(worker = worker_id, error = %e, "ignoring malformed worker message");
            }
            Err(e) => {
                warn!(worker = worker_id, error = %e, "worker connection fault");
                break;
            }
        }
    }

    scheduler.worker_disconnected(worker_id);
    writer_task.abort();
}

/// Translate one inbound message into the matching scheduler call.
///
/// Scheduler errors are logged and dropped here: a bad report must
/// never take down the connection or the scheduling loop.
fn handle_message(scheduler: &Scheduler, worker_id: WorkerId, msg: FromWorker) {
    match msg {
        FromWorker::Handshake { capacity } => {
            scheduler.worker_handshake(worker_id, capacity);
        }
        FromWorker::Completed {
            match_id,
            outcome,
            result,
            replay,
        } => {
            if let Err(e) =
                scheduler.match_completed(worker_id, match_id, outcome, result, &replay)
            {
                error!(
                    worker = worker_id,
                    match_id,
                    error = %e,
                    "failed to record match completion"
                );
            }
        }
        FromWorker::ScrimmageCompleted {
            scrimmage_id,
            outcome,
            result,
        } => {
            if let Err(e) =
                scheduler.scrimmage_completed(worker_id, scrimmage_id, outcome, result)
            {
                error!(
                    worker = worker_id,
                    scrimmage_id,
                    error = %e,
                    "failed to record scrimmage completion"
                );
            }
        }
    }
}
