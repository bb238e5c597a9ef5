//! # evmbind-primitives
//!
//! Fixed-size values shared by every evmbind crate: the 20-byte [`Address`],
//! the 32-byte [`H256`] word and the 256-bit unsigned [`U256`].
//!
//! The ABI wire format is built out of 32-byte words, so both fixed types know
//! how to move in and out of a word (see [`Address::to_word`] and
//! [`H256::from_address`]).

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod hash;

pub use address::Address;
pub use error::PrimitiveError;
pub use hash::H256;

pub use primitive_types::U256;

/// Transaction nonce type
pub type Nonce = u64;

/// Block number type
pub type BlockNumber = u64;

/// Parse a `0x`-prefixed (or bare) hex string into raw bytes.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, PrimitiveError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|e| PrimitiveError::InvalidHex(e.to_string()))
}

/// Render bytes as a `0x`-prefixed lowercase hex string.
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
