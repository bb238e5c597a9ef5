//! # evmbind-types
//!
//! Ledger-side data model:
//! - [`TransactionRequest`] and its signed, RLP-encoded form [`SignedTransaction`]
//! - [`TransactionReceipt`] with its [`LogRecord`]s

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod receipt;
pub mod transaction;

pub use error::TypesError;
pub use receipt::{LogRecord, TransactionReceipt, TxStatus};
pub use transaction::{create_address, SignedTransaction, TransactionRequest, TxSignature};
