//! Framing errors for the length-prefixed server stream and the line-based
//! client stream.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    /// Server frame longer than allowed.
    #[error("message size {actual} exceeds maximum {max}")]
    MessageTooLarge { actual: usize, max: usize },

    /// Client line longer than allowed. The whole line is dropped.
    #[error("line longer than {max} bytes, discarded")]
    LineTooLong { actual: usize, max: usize },

    /// Payload isn't UTF-8 or doesn't follow `<code>|<text>`.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),
}

impl From<FrameError> for io::Error {
    fn from(error: FrameError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, error)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
