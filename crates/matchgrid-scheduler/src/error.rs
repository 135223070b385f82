//! Scheduler error types.

use thiserror::Error;

use matchgrid_state::{MapId, PlayerId, RunId, ScrimmageId};

/// Result type alias for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors surfaced to callers of the scheduler's public operations.
///
/// Stale completion reports have no variant here: they are discarded
/// internally and logged, never returned.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("player not found: {0}")]
    PlayerNotFound(PlayerId),

    #[error("map not found: {0}")]
    MapNotFound(MapId),

    #[error("run not found: {0}")]
    RunNotFound(RunId),

    #[error("scrimmage not found: {0}")]
    ScrimmageNotFound(ScrimmageId),

    #[error("scrimmage {0} is currently being analyzed")]
    ScrimmageBusy(ScrimmageId),

    #[error("a run needs at least one seed and one map")]
    EmptyRun,

    #[error("state store error: {0}")]
    State(#[from] matchgrid_state::StateError),

    #[error("artifact error: {0}")]
    Artifact(#[from] matchgrid_artifacts::ArtifactError),
}
