//! RpcClient - typed access to the JSON-RPC surface

use std::sync::Arc;

use bytes::Bytes;
use evmbind_primitives::{Address, BlockNumber, Nonce, H256, U256};
use evmbind_types::{LogRecord, SignedTransaction, TransactionReceipt, TxStatus};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::transport::{deserialize_response, MockTransport, Transport};
use crate::types::{BlockId, CallRequest, LogFilter};
use crate::SdkError;

#[cfg(feature = "http")]
use crate::transport::HttpTransport;

/// Client for the ledger's JSON-RPC endpoint.
///
/// Cloning is cheap; clones share the transport and the cached chain id.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    chain_id: Arc<OnceCell<u64>>,
}

impl RpcClient {
    /// Create a client with HTTP transport. No request is made until first use.
    #[cfg(feature = "http")]
    pub fn http(url: &str) -> Self {
        Self::with_transport(HttpTransport::new(url))
    }

    /// Create a new client with mock transport (for testing)
    pub fn new_mock() -> Self {
        Self::with_transport(MockTransport::new())
    }

    /// Create a client with a custom transport
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    /// Create a client over a transport the caller keeps a handle to
    pub fn from_shared(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            chain_id: Arc::new(OnceCell::new()),
        }
    }

    /// Raw request
    pub async fn request_value(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        debug!(method, "rpc request");
        self.transport.request_json(method, params).await
    }

    /// Helper method to make RPC request and deserialize
    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, SdkError> {
        let value = self.request_value(method, params).await?;
        deserialize_response(value)
    }

    // ==================== Chain Info ====================

    /// Get the chain ID, fetched once and cached
    pub async fn chain_id(&self) -> Result<u64, SdkError> {
        self.chain_id
            .get_or_try_init(|| async {
                let result: String = self.request("eth_chainId", vec![]).await?;
                parse_hex_u64(&result)
            })
            .await
            .copied()
    }

    /// Get the current gas price
    pub async fn gas_price(&self) -> Result<U256, SdkError> {
        let result: String = self.request("eth_gasPrice", vec![]).await?;
        parse_hex_u256(&result)
    }

    /// Get the current block number
    pub async fn block_number(&self) -> Result<BlockNumber, SdkError> {
        let result: String = self.request("eth_blockNumber", vec![]).await?;
        parse_hex_u64(&result)
    }

    // ==================== Account Queries ====================

    /// Get the nonce (transaction count) of an address
    pub async fn transaction_count(&self, address: &Address, block: BlockId) -> Result<Nonce, SdkError> {
        let result: String = self
            .request(
                "eth_getTransactionCount",
                vec![Value::String(address.to_hex()), serde_json::to_value(block)?],
            )
            .await?;
        parse_hex_u64(&result)
    }

    /// Get the code at an address
    pub async fn get_code(&self, address: &Address, block: BlockId) -> Result<Bytes, SdkError> {
        let result: String = self
            .request(
                "eth_getCode",
                vec![Value::String(address.to_hex()), serde_json::to_value(block)?],
            )
            .await?;
        parse_hex_bytes(&result)
    }

    // ==================== Transactions ====================

    /// Broadcast a signed transaction; returns the hash reported by the node
    pub async fn send_raw_transaction(&self, tx: &SignedTransaction) -> Result<H256, SdkError> {
        let raw = format!("0x{}", hex::encode(tx.raw()));
        let result: String = self
            .request("eth_sendRawTransaction", vec![Value::String(raw)])
            .await?;
        Ok(H256::from_hex(&result)?)
    }

    /// Get a transaction receipt; `None` while the transaction is not mined
    pub async fn get_receipt(&self, hash: &H256) -> Result<Option<TransactionReceipt>, SdkError> {
        let result = self
            .request_value("eth_getTransactionReceipt", vec![Value::String(hash.to_hex())])
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        parse_receipt(&result).map(Some)
    }

    // ==================== Call & Estimation ====================

    /// Execute a call (read-only, does not create transaction)
    pub async fn call(&self, request: &CallRequest, block: BlockId) -> Result<Bytes, SdkError> {
        let result: String = self
            .request(
                "eth_call",
                vec![serde_json::to_value(request)?, serde_json::to_value(block)?],
            )
            .await?;
        parse_hex_bytes(&result)
    }

    /// Estimate gas for a transaction
    pub async fn estimate_gas(&self, request: &CallRequest) -> Result<U256, SdkError> {
        let result: String = self
            .request("eth_estimateGas", vec![serde_json::to_value(request)?])
            .await?;
        parse_hex_u256(&result)
    }

    // ==================== Logs ====================

    /// Fetch logs matching a filter
    pub async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogRecord>, SdkError> {
        let result = self
            .request_value("eth_getLogs", vec![serde_json::to_value(filter)?])
            .await?;
        let entries = result
            .as_array()
            .ok_or_else(|| SdkError::InvalidResponse("eth_getLogs result is not an array".into()))?;
        entries.iter().map(parse_log).collect()
    }
}

// ==================== Helper Functions ====================

fn field<'a>(obj: &'a Value, name: &str) -> Result<&'a str, SdkError> {
    obj.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| SdkError::InvalidResponse(format!("missing field {}", name)))
}

fn optional_field<'a>(obj: &'a Value, name: &str) -> Option<&'a str> {
    obj.get(name).and_then(Value::as_str)
}

fn parse_receipt(obj: &Value) -> Result<TransactionReceipt, SdkError> {
    let status = match field(obj, "status")? {
        "0x1" | "0x01" => TxStatus::Success,
        "0x0" | "0x00" => TxStatus::Reverted,
        other => return Err(SdkError::InvalidResponse(format!("unknown receipt status {}", other))),
    };

    let contract_address = optional_field(obj, "contractAddress")
        .map(Address::from_hex)
        .transpose()?;

    let logs = match obj.get("logs") {
        Some(Value::Array(entries)) => entries.iter().map(parse_log).collect::<Result<_, _>>()?,
        _ => Vec::new(),
    };

    Ok(TransactionReceipt {
        transaction_hash: H256::from_hex(field(obj, "transactionHash")?)?,
        block_number: parse_hex_u64(field(obj, "blockNumber")?)?,
        gas_used: parse_hex_u256(field(obj, "gasUsed")?)?,
        status,
        contract_address,
        logs,
    })
}

fn parse_log(obj: &Value) -> Result<LogRecord, SdkError> {
    let topics = obj
        .get("topics")
        .and_then(Value::as_array)
        .ok_or_else(|| SdkError::InvalidResponse("log without topics".to_string()))?
        .iter()
        .map(|t| {
            t.as_str()
                .ok_or_else(|| SdkError::InvalidResponse("topic is not a string".to_string()))
                .and_then(|s| Ok(H256::from_hex(s)?))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LogRecord {
        address: Address::from_hex(field(obj, "address")?)?,
        topics,
        data: parse_hex_bytes(field(obj, "data")?)?,
        block_number: optional_field(obj, "blockNumber").map(parse_hex_u64).transpose()?,
        transaction_hash: optional_field(obj, "transactionHash")
            .map(H256::from_hex)
            .transpose()?,
    })
}

pub(crate) fn parse_hex_u64(s: &str) -> Result<u64, SdkError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).map_err(|e| SdkError::InvalidHex(e.to_string()))
}

pub(crate) fn parse_hex_u256(s: &str) -> Result<U256, SdkError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    U256::from_str_radix(s, 16).map_err(|e| SdkError::InvalidHex(e.to_string()))
}

pub(crate) fn parse_hex_bytes(s: &str) -> Result<Bytes, SdkError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Ok(Bytes::new());
    }
    let bytes = hex::decode(s)?;
    Ok(Bytes::from(bytes))
}
