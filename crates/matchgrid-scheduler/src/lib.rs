//! matchgrid-scheduler — run lifecycle, match assignment, redundancy.
//!
//! The core of MatchGrid: a single scheduler service object that owns
//! the live worker-handle set and drives the run/match state machine.
//!
//! # Architecture
//!
//! ```text
//! Scheduler (one mutex around all scheduling decisions)
//!   ├── StateStore (runs, matches, scrimmages, players, map catalog)
//!   ├── ArtifactStore (engine, lists, maps, team packages, replays)
//!   ├── NotificationBus (runs / connections / scrimmages channels)
//!   └── WorkerHandle per connection
//!       ├── capacity + assignment set
//!       ├── last-shipped dependency hashes
//!       └── outbound message queue (drained by the connection task)
//! ```
//!
//! Dispatch precedence per worker: queued scrimmages, queued run
//! matches, redundant running matches, redundant running scrimmages.
//! Completion handling is race-safe: only the first report for a match
//! is persisted, later duplicates are discarded as stale.

pub mod error;
pub mod scheduler;
pub mod worker;

pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::Scheduler;
pub use worker::{Assignment, ConnectionInfo, WorkerHandle, WorkerId};
