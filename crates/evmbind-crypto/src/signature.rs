//! secp256k1 ECDSA signatures in the recoverable `(r, s, v)` form used by EVM transactions

use evmbind_primitives::{Address, H256};
use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};

use crate::{keccak256, CryptoError};

/// Private key (32-byte secp256k1 scalar)
pub type PrivateKey = SigningKey;

/// Public key
pub type PublicKey = VerifyingKey;

/// Recoverable ECDSA signature. `v` is the raw recovery id (0 or 1).
#[derive(Clone, PartialEq, Eq)]
pub struct Signature {
    /// r component
    pub r: [u8; 32],
    /// s component, always in the lower half of the curve order
    pub s: [u8; 32],
    /// recovery id
    pub v: u8,
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signature").field("v", &self.v).finish_non_exhaustive()
    }
}

/// Sign a 32-byte prehash. The result is low-s normalised (EIP-2).
pub fn sign(message_hash: &H256, private_key: &PrivateKey) -> Result<Signature, CryptoError> {
    let (signature, recovery_id) = private_key
        .sign_prehash_recoverable(message_hash.as_bytes())
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

    let (signature, recovery_id) = match signature.normalize_s() {
        Some(normalized) => {
            let flipped = RecoveryId::from_byte(recovery_id.to_byte() ^ 1)
                .ok_or_else(|| CryptoError::SigningFailed("recovery id out of range".to_string()))?;
            (normalized, flipped)
        }
        None => (signature, recovery_id),
    };

    Ok(Signature {
        r: signature.r().to_bytes().into(),
        s: signature.s().to_bytes().into(),
        v: recovery_id.to_byte(),
    })
}

/// Recover the signer's address from a prehash and signature
pub fn recover_address(message_hash: &H256, signature: &Signature) -> Result<Address, CryptoError> {
    let r: k256::FieldBytes = signature.r.into();
    let s: k256::FieldBytes = signature.s.into();
    let sig = K256Signature::from_scalars(r, s)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    let recovery_id = RecoveryId::from_byte(signature.v)
        .ok_or_else(|| CryptoError::InvalidSignature(format!("recovery id {}", signature.v)))?;

    let key = VerifyingKey::recover_from_prehash(message_hash.as_bytes(), &sig, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;
    Ok(public_key_to_address(&key))
}

/// Derive the account address: last 20 bytes of keccak256 of the uncompressed key
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let encoded = public_key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);

    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(bytes)
}
