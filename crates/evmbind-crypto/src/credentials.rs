//! Signing identity

use evmbind_primitives::{Address, H256};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::{public_key_to_address, sign, CryptoError, PrivateKey, Signature};

/// A private key and the address derived from it.
///
/// Immutable once constructed. `Clone` is deliberately not implemented so the key
/// is never duplicated by accident; share it behind an `Arc` instead.
pub struct Credentials {
    key: PrivateKey,
    address: Address,
}

impl Credentials {
    /// Build from a 32-byte secret scalar
    pub fn from_private_key(key: &[u8; 32]) -> Result<Self, CryptoError> {
        let key = SigningKey::from_slice(key)
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_signing_key(key))
    }

    /// Build from hex key material, with or without `0x`
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, CryptoError> {
        let hex_key = hex_key.trim();
        let hex_key = hex_key.strip_prefix("0x").unwrap_or(hex_key);
        let mut bytes =
            hex::decode(hex_key).map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;

        let result = match <[u8; 32]>::try_from(bytes.as_slice()) {
            Ok(mut key) => {
                let credentials = Self::from_private_key(&key);
                key.zeroize();
                credentials
            }
            Err(_) => Err(CryptoError::InvalidPrivateKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            ))),
        };
        bytes.zeroize();
        result
    }

    /// Fresh random identity
    pub fn random() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    fn from_signing_key(key: SigningKey) -> Self {
        let address = public_key_to_address(key.verifying_key());
        Self { key, address }
    }

    /// Address controlled by this key
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a 32-byte prehash
    pub fn sign_hash(&self, hash: &H256) -> Result<Signature, CryptoError> {
        sign(hash, &self.key)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recover_address;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_from_hex_derives_address() {
        let creds = Credentials::from_private_key_hex(DEV_KEY).unwrap();
        assert_eq!(creds.address().to_hex(), "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");

        let bare = Credentials::from_private_key_hex(DEV_KEY.trim_start_matches("0x")).unwrap();
        assert_eq!(bare.address(), creds.address());
    }

    #[test]
    fn test_rejects_bad_material() {
        assert!(Credentials::from_private_key_hex("0x1234").is_err());
        assert!(Credentials::from_private_key_hex("not hex").is_err());
        assert!(Credentials::from_private_key(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_sign_hash_recovers_to_address() {
        let creds = Credentials::random();
        let hash = H256::from_bytes([7; 32]);
        let sig = creds.sign_hash(&hash).unwrap();
        assert_eq!(recover_address(&hash, &sig).unwrap(), creds.address());
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", Credentials::random());
        assert!(debug.contains("address"));
        assert!(!debug.contains("key"));
    }
}
