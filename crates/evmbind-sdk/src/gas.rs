//! Gas policies

use std::collections::HashMap;

use async_trait::async_trait;
use evmbind_primitives::U256;

use crate::client::RpcClient;
use crate::SdkError;

/// Gas price and limit for one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasParams {
    /// Price per unit of gas, in wei
    pub gas_price: U256,
    /// Maximum gas the transaction may use
    pub gas_limit: U256,
}

/// Supplies gas parameters per transaction.
///
/// `function` is the name of the function being invoked, `None` for a
/// deployment.
#[async_trait]
pub trait GasPolicy: Send + Sync {
    /// Gas parameters for the next transaction
    async fn gas_params(&self, function: Option<&str>) -> Result<GasParams, SdkError>;
}

/// Constant price and limit, with optional per-function limits
#[derive(Debug, Clone)]
pub struct StaticGasPolicy {
    gas_price: U256,
    gas_limit: U256,
    function_limits: HashMap<String, U256>,
}

impl StaticGasPolicy {
    /// Same price and limit for every transaction
    pub fn new(gas_price: U256, gas_limit: U256) -> Self {
        Self {
            gas_price,
            gas_limit,
            function_limits: HashMap::new(),
        }
    }

    /// Use `gas_limit` for calls to `function`
    pub fn with_function_limit(mut self, function: impl Into<String>, gas_limit: U256) -> Self {
        self.function_limits.insert(function.into(), gas_limit);
        self
    }
}

#[async_trait]
impl GasPolicy for StaticGasPolicy {
    async fn gas_params(&self, function: Option<&str>) -> Result<GasParams, SdkError> {
        let gas_limit = function
            .and_then(|name| self.function_limits.get(name))
            .copied()
            .unwrap_or(self.gas_limit);
        Ok(GasParams {
            gas_price: self.gas_price,
            gas_limit,
        })
    }
}

/// Price from `eth_gasPrice` on every transaction, fixed limit
#[derive(Clone)]
pub struct NodeGasPolicy {
    client: RpcClient,
    gas_limit: U256,
}

impl NodeGasPolicy {
    /// Create a policy asking `client` for the price
    pub fn new(client: RpcClient, gas_limit: U256) -> Self {
        Self { client, gas_limit }
    }
}

#[async_trait]
impl GasPolicy for NodeGasPolicy {
    async fn gas_params(&self, _function: Option<&str>) -> Result<GasParams, SdkError> {
        Ok(GasParams {
            gas_price: self.client.gas_price().await?,
            gas_limit: self.gas_limit,
        })
    }
}
