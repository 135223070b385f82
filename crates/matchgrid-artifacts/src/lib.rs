//! matchgrid-artifacts — on-disk artifact storage and dependency sync.
//!
//! Owns the artifact root (engine binary, allow/deny lists, cost table,
//! map files, team packages, scrimmage uploads, match replays), sha-256
//! content hashing with an mtime-guarded cache, and the delta-planning
//! policy that decides which artifacts a given worker still needs.

pub mod error;
pub mod store;
pub mod sync;

pub use error::{ArtifactError, ArtifactResult};
pub use store::{Artifact, ArtifactStore, EngineUpdate, SharedArtifact};
pub use sync::{DependencyHashes, plan_match, plan_scrimmage};
