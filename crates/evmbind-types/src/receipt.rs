//! Transaction receipt types

use bytes::Bytes;
use evmbind_primitives::{Address, BlockNumber, H256, U256};

/// Transaction execution status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStatus {
    /// Execution reverted
    Reverted = 0,
    /// Transaction succeeded
    Success = 1,
}

impl From<bool> for TxStatus {
    fn from(success: bool) -> Self {
        if success {
            TxStatus::Success
        } else {
            TxStatus::Reverted
        }
    }
}

/// Log entry emitted during transaction execution
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    /// Contract address that emitted the log
    pub address: Address,
    /// Log topics (event id followed by indexed parameters)
    pub topics: Vec<H256>,
    /// Log data (non-indexed parameters)
    pub data: Bytes,
    /// Block the log was included in, when known
    pub block_number: Option<BlockNumber>,
    /// Transaction that emitted the log, when known
    pub transaction_hash: Option<H256>,
}

impl LogRecord {
    /// Create a log entry with no block context
    pub fn new(address: Address, topics: Vec<H256>, data: Bytes) -> Self {
        Self {
            address,
            topics,
            data,
            block_number: None,
            transaction_hash: None,
        }
    }

    /// Get the first topic (the event signature for non-anonymous events)
    pub fn topic0(&self) -> Option<&H256> {
        self.topics.first()
    }
}

/// Receipt of a mined transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Transaction hash
    pub transaction_hash: H256,
    /// Block number
    pub block_number: BlockNumber,
    /// Gas used by this transaction
    pub gas_used: U256,
    /// Execution status
    pub status: TxStatus,
    /// Address of a deployed contract
    pub contract_address: Option<Address>,
    /// Emitted logs
    pub logs: Vec<LogRecord>,
}

impl TransactionReceipt {
    /// Whether execution succeeded
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }

    /// Logs emitted by `address`
    pub fn logs_from<'a>(&'a self, address: &'a Address) -> impl Iterator<Item = &'a LogRecord> + 'a {
        self.logs.iter().filter(move |log| &log.address == address)
    }
}
