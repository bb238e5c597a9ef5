//! Cryptographic errors

use thiserror::Error;

/// Cryptographic operation error
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The key bytes are not a valid secp256k1 scalar
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Signing failed
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// Signature components are malformed
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Public key recovery failed
    #[error("public key recovery failed: {0}")]
    RecoveryFailed(String),
}
