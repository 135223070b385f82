//! matchd — daemon plumbing for MatchGrid.
//!
//! The binary in `main.rs` assembles the subsystems; this library holds
//! the pieces with behavior worth testing in isolation: the per-worker
//! connection loop, the accept loop, and the background map rescan.

pub mod background;
pub mod connection;
pub mod listener;
