//! # evmbind-abi
//!
//! The Solidity ABI: a type system ([`AbiType`]), values ([`AbiValue`]) and the
//! head/tail codec over 32-byte words.
//!
//! ```rust
//! use evmbind_abi::{decode, encode, function_selector, AbiType, AbiValue};
//! use evmbind_primitives::{Address, U256};
//!
//! let types = [AbiType::Address, AbiType::Uint(256)];
//! let values = [AbiValue::Address(Address::ZERO), AbiValue::Uint(U256::from(1000))];
//!
//! let mut call = function_selector("transfer(address,uint256)").to_vec();
//! call.extend(encode(&types, &values).unwrap());
//! assert_eq!(call.len(), 68);
//!
//! let back = decode(&types, &call[4..]).unwrap();
//! assert_eq!(back, values);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod decode;
mod encode;
mod error;
mod signature;
mod types;

pub use decode::decode;
pub use encode::encode;
pub use error::AbiError;
pub use signature::{canonical_signature, function_selector, parse_signature, topic_hash};
pub use types::{AbiType, AbiValue, I256};
