//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while framing or decoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("frame of {0} bytes exceeds the protocol limit")]
    Oversized(u32),
}
