//! Errors raised while parsing primitives

use thiserror::Error;

/// Primitive parsing error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrimitiveError {
    /// Input was not valid hex
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    /// Input decoded to the wrong number of bytes
    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Required byte length
        expected: usize,
        /// Byte length actually supplied
        got: usize,
    },
}
