//! # evmbind-crypto
//!
//! Cryptography needed to talk to an EVM ledger:
//!
//! - Keccak-256, the hash behind selectors, topics and transaction hashes
//! - secp256k1 ECDSA signing with EIP-2 low-s normalisation and key recovery
//! - [`Credentials`]: a signing key together with its derived address

#![warn(missing_docs)]
#![warn(clippy::all)]

mod credentials;
mod error;
mod hash;
mod signature;

pub use credentials::Credentials;
pub use error::CryptoError;
pub use hash::keccak256;
pub use signature::{public_key_to_address, recover_address, sign, PrivateKey, PublicKey, Signature};
