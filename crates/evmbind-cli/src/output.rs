//! Output formatting

use evmbind_sdk::{TransactionReceipt, U256};
use serde_json::{Map, Value};

/// Output builder: a JSON object in `--json` mode, one message otherwise
pub struct Output {
    json_mode: bool,
    fields: Map<String, Value>,
    message: Option<String>,
}

impl Output {
    /// Create a new output builder
    pub fn new(json_mode: bool) -> Self {
        Self {
            json_mode,
            fields: Map::new(),
            message: None,
        }
    }

    /// Add a string field
    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Add a u64 field
    pub fn field_u64(mut self, key: &str, value: u64) -> Self {
        self.fields.insert(key.to_string(), Value::Number(value.into()));
        self
    }

    /// Add a 256-bit integer field, as a decimal string
    pub fn field_u256(mut self, key: &str, value: &U256) -> Self {
        self.fields.insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Add a JSON value field
    pub fn field_value(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Add the summary fields of a receipt
    pub fn receipt(self, receipt: &TransactionReceipt) -> Self {
        let mut out = self
            .field("tx_hash", &receipt.transaction_hash.to_hex())
            .field_u64("block_number", receipt.block_number)
            .field_u256("gas_used", &receipt.gas_used)
            .field_value("success", Value::Bool(receipt.is_success()));
        if let Some(address) = &receipt.contract_address {
            out = out.field("contract_address", &address.to_hex());
        }
        out
    }

    /// Set the human-readable message
    pub fn message(mut self, msg: &str) -> Self {
        self.message = Some(msg.to_string());
        self
    }

    /// Render without printing
    pub fn render(&self) -> Option<String> {
        if self.json_mode {
            serde_json::to_string_pretty(&Value::Object(self.fields.clone())).ok()
        } else {
            self.message.clone()
        }
    }

    /// Print the output
    pub fn print(self) {
        if let Some(text) = self.render() {
            println!("{}", text);
        }
    }
}
