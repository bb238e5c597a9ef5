//! CLI error types

use evmbind_sdk::SdkError;
use thiserror::Error;

/// CLI error type
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid address format
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid private key
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    /// No private key configured for a command that signs
    #[error("No private key: set EVMBIND_PRIVATE_KEY or pass --private-key")]
    MissingKey,

    /// No token address configured
    #[error("No contract address: set EVMBIND_CONTRACT, contract_address or pass --contract")]
    MissingContract,

    /// Invalid transaction hash
    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    /// Invalid amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Node is on another chain than configured
    #[error("Chain id mismatch: configured {expected}, node reports {actual}")]
    ChainMismatch {
        /// Configured chain id
        expected: u64,
        /// Chain id reported by the node
        actual: u64,
    },

    /// SDK error
    #[error(transparent)]
    Sdk(#[from] SdkError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),
}
