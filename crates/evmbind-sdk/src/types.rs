//! Request types for the JSON-RPC surface

use bytes::Bytes;
use evmbind_primitives::{Address, BlockNumber, H256, U256};
use serde::Serialize;

/// Block identifier for RPC queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockId {
    /// Block number
    Number(BlockNumber),
    /// Latest block
    #[default]
    Latest,
    /// Pending block (includes pending transactions)
    Pending,
    /// Earliest block (genesis)
    Earliest,
}

impl Serialize for BlockId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            BlockId::Number(n) => serializer.serialize_str(&format!("0x{:x}", n)),
            BlockId::Latest => serializer.serialize_str("latest"),
            BlockId::Pending => serializer.serialize_str("pending"),
            BlockId::Earliest => serializer.serialize_str("earliest"),
        }
    }
}

/// Call request for eth_call and eth_estimateGas
#[derive(Debug, Clone, Default)]
pub struct CallRequest {
    /// Sender address
    pub from: Option<Address>,
    /// Recipient address
    pub to: Option<Address>,
    /// Gas limit
    pub gas: Option<U256>,
    /// Gas price
    pub gas_price: Option<U256>,
    /// Value to transfer
    pub value: Option<U256>,
    /// Input data
    pub data: Option<Bytes>,
}

impl Serialize for CallRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let count = [
            self.from.is_some(),
            self.to.is_some(),
            self.gas.is_some(),
            self.gas_price.is_some(),
            self.value.is_some(),
            self.data.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count();

        let mut map = serializer.serialize_map(Some(count))?;

        if let Some(from) = &self.from {
            map.serialize_entry("from", &from.to_hex())?;
        }
        if let Some(to) = &self.to {
            map.serialize_entry("to", &to.to_hex())?;
        }
        if let Some(gas) = &self.gas {
            map.serialize_entry("gas", &quantity(gas))?;
        }
        if let Some(gas_price) = &self.gas_price {
            map.serialize_entry("gasPrice", &quantity(gas_price))?;
        }
        if let Some(value) = &self.value {
            map.serialize_entry("value", &quantity(value))?;
        }
        if let Some(data) = &self.data {
            map.serialize_entry("data", &format!("0x{}", hex::encode(data)))?;
        }

        map.end()
    }
}

/// Log filter for eth_getLogs
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    /// Emitting contract
    pub address: Option<Address>,
    /// Topic0 to match
    pub topic0: Option<H256>,
    /// First block, inclusive
    pub from_block: BlockId,
    /// Last block, inclusive
    pub to_block: BlockId,
}

impl Serialize for LogFilter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("fromBlock", &self.from_block)?;
        map.serialize_entry("toBlock", &self.to_block)?;
        if let Some(address) = &self.address {
            map.serialize_entry("address", &address.to_hex())?;
        }
        if let Some(topic0) = &self.topic0 {
            map.serialize_entry("topics", &[topic0.to_hex()])?;
        }
        map.end()
    }
}

/// JSON-RPC quantity: minimal hex with `0x` prefix, `0x0` for zero
pub(crate) fn quantity(value: &U256) -> String {
    format!("{:#x}", value)
}
