//! Errors for transaction assembly and decoding

use evmbind_crypto::CryptoError;
use evmbind_primitives::Address;
use thiserror::Error;

/// Transaction type errors
#[derive(Debug, Error)]
pub enum TypesError {
    /// Chain id 0 carries no replay protection
    #[error("chain id cannot be 0")]
    InvalidChainId,

    /// The signing key does not control the `from` address
    #[error("signer {signer} does not match sender {from}")]
    SignerMismatch {
        /// Address of the signing key
        signer: Address,
        /// Sender named in the request
        from: Address,
    },

    /// Signing or recovery failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Raw bytes are not a legacy transaction
    #[error("invalid transaction encoding: {0}")]
    Decode(String),
}
