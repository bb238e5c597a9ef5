//! Keccak-256 hashing

use evmbind_primitives::H256;
use sha3::{Digest, Keccak256};

/// Compute Keccak-256 of the input
pub fn keccak256(data: impl AsRef<[u8]>) -> H256 {
    let digest = Keccak256::digest(data.as_ref());
    H256::from_bytes(digest.into())
}
