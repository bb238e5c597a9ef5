//! # evmbind-sdk
//!
//! Descriptor-driven contract bindings for EVM ledgers.
//!
//! ## Features
//!
//! - **RpcClient**: typed JSON-RPC access over a pluggable [`Transport`]
//! - **DescriptorSet**: immutable table of functions, events and custom errors,
//!   written by hand or read from a compiler JSON ABI
//! - **TransactionManager**: nonce tracking, signing, broadcast and receipt polling
//! - **ContractHandle**: calls, sends, deployment, event queries and subscriptions
//! - **Erc20Token**: the bundled JYMToken table with typed operations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use evmbind_sdk::{
//!     erc20, ContractHandle, Credentials, PollConfig, RpcClient, StaticGasPolicy,
//!     TransactionManager, U256,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RpcClient::http("http://localhost:8545");
//!     let credentials = Credentials::from_private_key_hex(
//!         "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
//!     )?;
//!     let gas = Arc::new(StaticGasPolicy::new(
//!         U256::from(20_000_000_000u64),
//!         U256::from(6_721_975u64),
//!     ));
//!     let manager = Arc::new(TransactionManager::new(client, credentials, gas));
//!     let poll = PollConfig::new(Duration::from_secs(1), Duration::from_secs(120))?;
//!
//!     let token = ContractHandle::new(erc20::descriptors(), manager, poll)
//!         .with_binary(erc20::jym_token_binary()?);
//!     token.deploy(&[]).await?;
//!
//!     let balance = token.call("balanceOf", &[token.signer().into()]).await?;
//!     println!("balance: {}", balance);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binary;
pub mod call;
mod client;
pub mod contract;
pub mod decoder;
pub mod descriptor;
pub mod erc20;
mod error;
pub mod gas;
pub mod registry;
mod transport;
pub mod tx_manager;
pub mod types;

// Re-export main types
pub use binary::{link_binary, ContractBinary, LinkReference};
pub use call::{build_call_data, PreparedCall, Route};
pub use client::RpcClient;
pub use contract::{deploy, ContractHandle, EventSubscription, Invocation};
pub use decoder::{decode_event, decode_output, decode_revert, DecodedEvent, DecodedParam, RevertReason};
pub use descriptor::{CustomErrorDescriptor, EventDescriptor, FunctionDescriptor, Param};
pub use erc20::Erc20Token;
pub use error::SdkError;
pub use gas::{GasParams, GasPolicy, NodeGasPolicy, StaticGasPolicy};
pub use registry::DescriptorSet;
pub use transport::MockTransport;

/// Re-export Transport trait for custom implementations
pub use transport::Transport;
pub use tx_manager::{PendingTransaction, PollConfig, TransactionManager, TxPayload, TxState};

#[cfg(feature = "http")]
pub use transport::HttpTransport;

// Re-export the lower layers for convenience
pub use evmbind_abi::{AbiType, AbiValue, I256};
pub use evmbind_crypto::Credentials;
pub use evmbind_primitives::{Address, BlockNumber, Nonce, H256, U256};
pub use evmbind_types::{LogRecord, SignedTransaction, TransactionReceipt, TxStatus};
