//! WorkerHandle — the scheduler's view of one live worker connection.
//!
//! Tracks identity, capacity, and the set of assignments currently on
//! the worker, and pushes outbound protocol messages onto the
//! connection's send queue. Sending never blocks: the connection's own
//! writer task drains the queue to the socket, so the scheduler's
//! critical section never waits on the network.

use std::collections::HashSet;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use matchgrid_artifacts::DependencyHashes;
use matchgrid_proto::{DependencyDelta, ToWorker};
use matchgrid_state::{MatchId, ScrimmageId};

/// Connection-scoped worker identifier, assigned by the scheduler.
pub type WorkerId = u64;

/// One unit of work assigned to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Assignment {
    Match(MatchId),
    Scrimmage(ScrimmageId),
}

/// Snapshot of a worker connection for the control surface.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub id: WorkerId,
    pub addr: String,
    pub capacity: usize,
    pub assignments: Vec<String>,
}

/// Per-connection representation used by the scheduler.
pub struct WorkerHandle {
    id: WorkerId,
    addr: String,
    /// Zero until the worker's handshake arrives; a worker accepts no
    /// work before then.
    capacity: usize,
    assigned: HashSet<Assignment>,
    /// Human-readable labels for the assignments, for display.
    labels: Vec<(Assignment, String)>,
    /// Artifact hashes last shipped to this worker.
    pub(crate) known: DependencyHashes,
    outbox: mpsc::UnboundedSender<ToWorker>,
}

impl WorkerHandle {
    pub fn new(id: WorkerId, addr: String, outbox: mpsc::UnboundedSender<ToWorker>) -> Self {
        Self {
            id,
            addr,
            capacity: 0,
            assigned: HashSet::new(),
            labels: Vec::new(),
            known: DependencyHashes::new(),
            outbox,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Display label used in notifications and logs.
    pub fn label(&self) -> String {
        format!("worker-{} ({})", self.id, self.addr)
    }

    /// Record the capacity announced in the worker's handshake.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    /// True if the worker can accept more work.
    pub fn is_free(&self) -> bool {
        self.assigned.len() < self.capacity
    }

    /// Number of assignments currently on the worker.
    pub fn assigned_count(&self) -> usize {
        self.assigned.len()
    }

    /// True if this exact assignment is already on the worker.
    pub fn has(&self, assignment: Assignment) -> bool {
        self.assigned.contains(&assignment)
    }

    /// Send a match to the worker. Side effect only; never blocks.
    #[allow(clippy::too_many_arguments)]
    pub fn assign_match(
        &mut self,
        match_id: MatchId,
        run_id: u64,
        map: &str,
        seed: u64,
        team_a: &str,
        team_b: &str,
        deps: DependencyDelta,
        label: String,
    ) {
        self.assigned.insert(Assignment::Match(match_id));
        self.labels.push((Assignment::Match(match_id), label));
        self.send(ToWorker::Assign {
            match_id,
            run_id,
            map: map.to_string(),
            seed,
            team_a: team_a.to_string(),
            team_b: team_b.to_string(),
            deps,
        });
    }

    /// Send a scrimmage analysis job to the worker.
    pub fn assign_scrimmage(
        &mut self,
        scrimmage_id: ScrimmageId,
        file_name: &str,
        file: Vec<u8>,
        deps: DependencyDelta,
        label: String,
    ) {
        self.assigned.insert(Assignment::Scrimmage(scrimmage_id));
        self.labels.push((Assignment::Scrimmage(scrimmage_id), label));
        self.send(ToWorker::AssignScrimmage {
            scrimmage_id,
            file_name: file_name.to_string(),
            file,
            deps,
        });
    }

    /// Drop one assignment from the bookkeeping (the worker reported on
    /// it). Returns true if it was present.
    pub fn complete(&mut self, assignment: Assignment) -> bool {
        self.labels.retain(|(a, _)| *a != assignment);
        self.assigned.remove(&assignment)
    }

    /// Tell the worker to stop everything and clear the assignment set.
    /// Shipped artifact hashes stay valid; the worker keeps its files.
    pub fn stop_all(&mut self) {
        self.assigned.clear();
        self.labels.clear();
        self.send(ToWorker::StopAll);
    }

    /// Snapshot for the control surface.
    pub fn snapshot(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            addr: self.addr.clone(),
            capacity: self.capacity,
            assignments: self.labels.iter().map(|(_, l)| l.clone()).collect(),
        }
    }

    fn send(&self, msg: ToWorker) {
        // A failed send means the connection is already gone; the
        // disconnect path will clean up shortly.
        if self.outbox.send(msg).is_err() {
            debug!(worker = %self.label(), "send to closed worker connection dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_worker() -> (WorkerHandle, mpsc::UnboundedReceiver<ToWorker>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (WorkerHandle::new(1, "10.0.0.1:4000".to_string(), tx), rx)
    }

    #[test]
    fn no_capacity_before_handshake() {
        let (worker, _rx) = test_worker();
        assert!(!worker.is_free());
    }

    #[test]
    fn capacity_bounds_assignments() {
        let (mut worker, mut rx) = test_worker();
        worker.set_capacity(2);

        worker.assign_match(1, 1, "m", 0, "a", "b", DependencyDelta::default(), "m (0)".into());
        assert!(worker.is_free());
        worker.assign_match(2, 1, "m", 1, "a", "b", DependencyDelta::default(), "m (1)".into());
        assert!(!worker.is_free());
        assert_eq!(worker.assigned_count(), 2);

        assert!(matches!(rx.try_recv().unwrap(), ToWorker::Assign { match_id: 1, .. }));
        assert!(matches!(rx.try_recv().unwrap(), ToWorker::Assign { match_id: 2, .. }));
    }

    #[test]
    fn complete_frees_a_slot() {
        let (mut worker, _rx) = test_worker();
        worker.set_capacity(1);
        worker.assign_match(1, 1, "m", 0, "a", "b", DependencyDelta::default(), "m (0)".into());

        assert!(worker.complete(Assignment::Match(1)));
        assert!(!worker.complete(Assignment::Match(1)));
        assert!(worker.is_free());
        assert!(worker.snapshot().assignments.is_empty());
    }

    #[test]
    fn stop_all_clears_and_messages() {
        let (mut worker, mut rx) = test_worker();
        worker.set_capacity(4);
        worker.assign_match(1, 1, "m", 0, "a", "b", DependencyDelta::default(), "m (0)".into());
        worker.assign_scrimmage(9, "f.bin", vec![1], DependencyDelta::default(), "f.bin".into());

        worker.stop_all();
        assert_eq!(worker.assigned_count(), 0);

        let mut saw_stop = false;
        while let Ok(msg) = rx.try_recv() {
            if msg == ToWorker::StopAll {
                saw_stop = true;
            }
        }
        assert!(saw_stop);
    }

    #[test]
    fn send_after_connection_drop_is_harmless() {
        let (mut worker, rx) = test_worker();
        drop(rx);
        worker.set_capacity(1);
        worker.assign_match(1, 1, "m", 0, "a", "b", DependencyDelta::default(), "m (0)".into());
        assert_eq!(worker.assigned_count(), 1);
    }
}
