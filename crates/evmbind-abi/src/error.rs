//! ABI error types

use thiserror::Error;

/// Codec errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// Values do not match the declared types (arity, kind or width)
    #[error("argument mismatch: {0}")]
    ArgumentMismatch(String),

    /// Buffer could not be decoded against the declared types
    #[error("malformed ABI data: {0}")]
    MalformedData(String),

    /// Type string could not be parsed
    #[error("invalid ABI type: {0}")]
    InvalidType(String),
}
