//! matchgrid-state — embedded state persistence for MatchGrid.
//!
//! Defines the persisted domain types (runs, matches, scrimmage sets,
//! players, map catalog) and a redb-backed `StateStore` with typed CRUD
//! operations. Other crates treat the store as the single persistence
//! interface; nothing here knows about scheduling.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
