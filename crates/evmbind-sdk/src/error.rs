//! SDK error types

use evmbind_abi::AbiError;
use evmbind_crypto::CryptoError;
use evmbind_primitives::{PrimitiveError, H256};
use evmbind_types::TypesError;
use thiserror::Error;

use crate::decoder::RevertReason;

/// SDK error type
#[derive(Debug, Error)]
pub enum SdkError {
    /// Wrong arity or type for a descriptor; raised before any network call
    #[error("argument mismatch: {0}")]
    ArgumentMismatch(String),

    /// Returned data could not be decoded
    #[error("malformed ABI data: {0}")]
    MalformedAbiData(String),

    /// The contract handle has no address yet
    #[error("contract handle is not bound to an address")]
    NotBound,

    /// The contract handle already has an address
    #[error("contract handle is already bound to {0}")]
    AlreadyBound(evmbind_primitives::Address),

    /// Transport/network error
    #[error("transport error: {0}")]
    Transport(String),

    /// Execution reverted
    #[error("contract reverted: {reason}")]
    ContractReverted {
        /// Hash of the mined transaction, absent for read calls
        transaction_hash: Option<H256>,
        /// Decoded reason or the raw payload
        reason: RevertReason,
    },

    /// No receipt before the polling deadline; the transaction may still be mined
    #[error("no receipt for {transaction_hash} before the deadline")]
    TimedOut {
        /// Hash to re-poll
        transaction_hash: H256,
    },

    /// The node rejected the nonce
    #[error("nonce conflict: {0}")]
    NonceConflict(String),

    /// JSON-RPC error from the node
    #[error("RPC error: {code} - {message}")]
    Rpc {
        /// Error code
        code: i64,
        /// Error message
        message: String,
        /// Optional `data` member, revert payloads travel here
        data: Option<String>,
    },

    /// No function of that name in the descriptor set
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// No event of that name in the descriptor set
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Log topic0 is not the event's topic
    #[error("log is not a {0} event")]
    EventMismatch(String),

    /// A compiler ABI entry that does not describe a valid descriptor
    #[error("invalid ABI definition: {0}")]
    InvalidAbi(String),

    /// Deployment receipt carries no contract address
    #[error("deployment receipt has no contract address")]
    MissingContractAddress,

    /// Node answered with something that is not the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Signing failed
    #[error("signing failed: {0}")]
    Signing(String),

    /// Invalid hex string
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl SdkError {
    /// Whether a caller may retry the same operation.
    ///
    /// The SDK itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SdkError::Transport(_) | SdkError::TimedOut { .. })
    }
}

impl From<AbiError> for SdkError {
    fn from(e: AbiError) -> Self {
        match e {
            AbiError::ArgumentMismatch(msg) | AbiError::InvalidType(msg) => {
                SdkError::ArgumentMismatch(msg)
            }
            AbiError::MalformedData(msg) => SdkError::MalformedAbiData(msg),
        }
    }
}

impl From<TypesError> for SdkError {
    fn from(e: TypesError) -> Self {
        match e {
            TypesError::Decode(msg) => SdkError::InvalidResponse(msg),
            other => SdkError::Signing(other.to_string()),
        }
    }
}

impl From<CryptoError> for SdkError {
    fn from(e: CryptoError) -> Self {
        SdkError::Signing(e.to_string())
    }
}

impl From<PrimitiveError> for SdkError {
    fn from(e: PrimitiveError) -> Self {
        SdkError::InvalidHex(e.to_string())
    }
}

impl From<hex::FromHexError> for SdkError {
    fn from(e: hex::FromHexError) -> Self {
        SdkError::InvalidHex(e.to_string())
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(e: serde_json::Error) -> Self {
        SdkError::Serialization(e.to_string())
    }
}
