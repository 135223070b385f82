//! matchgrid-proto — the scheduler <-> worker wire protocol.
//!
//! One persistent connection per worker carries length-prefixed
//! MessagePack frames in both directions:
//!
//! - `FromWorker::Handshake` announces capacity (first message, always)
//! - `ToWorker::Assign` / `ToWorker::AssignScrimmage` push work plus the
//!   dependency artifacts the worker is missing
//! - `ToWorker::StopAll` discards everything in flight
//! - `FromWorker::Completed` / `FromWorker::ScrimmageCompleted` report
//!   results back
//!
//! A malformed frame body is a recoverable `Decode` error: the frame
//! boundary is intact, so the connection can keep reading.

pub mod error;
pub mod framing;
pub mod messages;

pub use error::ProtoError;
pub use framing::{MAX_FRAME_LEN, read_frame, write_frame};
pub use messages::{ArtifactBlob, DependencyDelta, FromWorker, ReportOutcome, ToWorker};
