//! Transport layer for RPC communication

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use evmbind_crypto::keccak256;
use parking_lot::Mutex;
use serde_json::Value;

use crate::SdkError;

/// Transport trait for RPC communication (object-safe)
///
/// Implementations move one JSON-RPC request and return its `result`, or an
/// [`SdkError::Rpc`] carrying the node's error object, or
/// [`SdkError::Transport`] when the node could not be reached.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an RPC request and get JSON response
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError>;
}

/// Helper to deserialize response
pub fn deserialize_response<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, SdkError> {
    serde_json::from_value(value).map_err(|e| SdkError::Serialization(e.to_string()))
}

/// One scripted reply
#[derive(Debug, Clone)]
enum MockReply {
    Value(Value),
    Rpc {
        code: i64,
        message: String,
        data: Option<String>,
    },
    Transport(String),
}

impl MockReply {
    fn into_result(self) -> Result<Value, SdkError> {
        match self {
            MockReply::Value(v) => Ok(v),
            MockReply::Rpc {
                code,
                message,
                data,
            } => Err(SdkError::Rpc {
                code,
                message,
                data,
            }),
            MockReply::Transport(msg) => Err(SdkError::Transport(msg)),
        }
    }
}

/// Mock transport for testing
///
/// Resolution order per request: queued replies for the method (consumed
/// once each), then a fixed response set with [`MockTransport::set_response`],
/// then built-in defaults. Every request is recorded.
pub struct MockTransport {
    responses: Mutex<HashMap<String, Value>>,
    queued: Mutex<HashMap<String, VecDeque<MockReply>>>,
    default_responses: HashMap<String, Value>,
    requests: Mutex<Vec<(String, Vec<Value>)>>,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        let mut defaults = HashMap::new();

        defaults.insert("eth_chainId".to_string(), Value::String("0x1".to_string()));
        defaults.insert("eth_gasPrice".to_string(), Value::String("0x3b9aca00".to_string())); // 1 gwei
        defaults.insert("eth_blockNumber".to_string(), Value::String("0x100".to_string())); // Block 256
        defaults.insert("eth_getTransactionCount".to_string(), Value::String("0x0".to_string()));
        defaults.insert("eth_estimateGas".to_string(), Value::String("0x5208".to_string())); // 21000
        defaults.insert("eth_call".to_string(), Value::String("0x".to_string()));
        defaults.insert("eth_getCode".to_string(), Value::String("0x".to_string()));
        defaults.insert("eth_getTransactionReceipt".to_string(), Value::Null);
        defaults.insert("eth_getLogs".to_string(), Value::Array(vec![]));

        Self {
            responses: Mutex::new(HashMap::new()),
            queued: Mutex::new(HashMap::new()),
            default_responses: defaults,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Set a fixed response for a method
    pub fn set_response(&self, method: &str, response: Value) {
        self.responses.lock().insert(method.to_string(), response);
    }

    /// Clear fixed responses
    pub fn clear_responses(&self) {
        self.responses.lock().clear();
    }

    /// Queue a one-shot response for a method
    pub fn push_response(&self, method: &str, response: Value) {
        self.push(method, MockReply::Value(response));
    }

    /// Queue a one-shot JSON-RPC error for a method
    pub fn push_rpc_error(&self, method: &str, code: i64, message: &str, data: Option<&str>) {
        self.push(
            method,
            MockReply::Rpc {
                code,
                message: message.to_string(),
                data: data.map(str::to_string),
            },
        );
    }

    /// Queue a one-shot transport failure for a method
    pub fn push_transport_error(&self, method: &str, message: &str) {
        self.push(method, MockReply::Transport(message.to_string()));
    }

    fn push(&self, method: &str, reply: MockReply) {
        self.queued
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Every request seen so far, in order
    pub fn requests(&self) -> Vec<(String, Vec<Value>)> {
        self.requests.lock().clone()
    }

    /// Parameters of every request for `method`, in order
    pub fn requests_for(&self, method: &str) -> Vec<Vec<Value>> {
        self.requests
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        self.requests
            .lock()
            .push((method.to_string(), params.clone()));

        let queued = self
            .queued
            .lock()
            .get_mut(method)
            .and_then(|replies| replies.pop_front());
        if let Some(reply) = queued {
            return reply.into_result();
        }

        if let Some(response) = self.responses.lock().get(method).cloned() {
            return Ok(response);
        }

        // the hash of a raw transaction is keccak256 of its bytes
        if method == "eth_sendRawTransaction" {
            let raw = params
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| SdkError::InvalidResponse("missing raw transaction".to_string()))?;
            let bytes = evmbind_primitives::decode_hex(raw)?;
            return Ok(Value::String(keccak256(&bytes).to_hex()));
        }

        if let Some(response) = self.default_responses.get(method) {
            return Ok(response.clone());
        }

        Err(SdkError::Rpc {
            code: -32601,
            message: format!("Method not found: {}", method),
            data: None,
        })
    }
}

/// HTTP transport for real RPC communication
#[cfg(feature = "http")]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    request_id: std::sync::atomic::AtomicU64,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            request_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.request_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for HttpTransport {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        let id = self.next_id();
        tracing::trace!(id, method, "json-rpc request");

        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SdkError::Transport(e.to_string()))?;

        let response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| SdkError::Transport(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(SdkError::Rpc {
                code: error.code,
                message: error.message,
                data: error.data.map(|d| match d {
                    Value::String(s) => s,
                    other => other.to_string(),
                }),
            });
        }

        // `null` is a legitimate result (e.g. a receipt that does not exist yet)
        Ok(response.result.unwrap_or(Value::Null))
    }
}

#[cfg(feature = "http")]
#[derive(serde::Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[cfg(feature = "http")]
#[derive(serde::Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}
