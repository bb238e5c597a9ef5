//! CLI configuration management
//!
//! Values come from `~/.evmbind/config.toml`, then `EVMBIND_*` environment
//! variables, then command-line flags. The private key is never read from or
//! written to the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use evmbind_sdk::{Address, Credentials, PollConfig, StaticGasPolicy, U256};
use serde::{Deserialize, Serialize};

use crate::CliError;

/// CLI configuration
///
/// Not `Debug`: it may hold the signing key.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint URL
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Static gas price in wei
    #[serde(default = "default_gas_price")]
    pub gas_price: u64,
    /// Static gas limit
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    /// Receipt poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Receipt wait deadline in seconds
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    /// Deployed token address
    #[serde(default)]
    pub contract_address: Option<String>,
    /// Expected chain id; fetched from the node when absent
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Signing key, environment or flag only
    #[serde(skip)]
    pub private_key: Option<String>,
}

fn default_rpc_url() -> String {
    "http://localhost:8545".to_string()
}

fn default_gas_price() -> u64 {
    20_000_000_000
}

fn default_gas_limit() -> u64 {
    6_721_975
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_poll_timeout_secs() -> u64 {
    120
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            gas_price: default_gas_price(),
            gas_limit: default_gas_limit(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_secs: default_poll_timeout_secs(),
            contract_address: None,
            chain_id: None,
            private_key: None,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".evmbind"))
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Load the default config file, or defaults when there is none
    pub fn load() -> Result<Self, CliError> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load a specific config file
    pub fn load_from(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply `EVMBIND_*` overrides from `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), CliError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("EVMBIND_RPC_URL") {
            self.rpc_url = url;
        }
        if let Some(key) = lookup("EVMBIND_PRIVATE_KEY") {
            self.private_key = Some(key);
        }
        if let Some(price) = lookup("EVMBIND_GAS_PRICE") {
            self.gas_price = parse_number("EVMBIND_GAS_PRICE", &price)?;
        }
        if let Some(limit) = lookup("EVMBIND_GAS_LIMIT") {
            self.gas_limit = parse_number("EVMBIND_GAS_LIMIT", &limit)?;
        }
        if let Some(contract) = lookup("EVMBIND_CONTRACT") {
            self.contract_address = Some(contract);
        }
        Ok(())
    }

    /// Signing credentials
    pub fn credentials(&self) -> Result<Credentials, CliError> {
        let key = self.private_key.as_deref().ok_or(CliError::MissingKey)?;
        Credentials::from_private_key_hex(key).map_err(|e| CliError::InvalidKey(e.to_string()))
    }

    /// Token address, if one is configured
    pub fn contract(&self) -> Result<Option<Address>, CliError> {
        self.contract_address
            .as_deref()
            .map(|s| Address::from_hex(s).map_err(|e| CliError::InvalidAddress(format!("{}: {}", s, e))))
            .transpose()
    }

    /// Static gas policy built from `gas_price`/`gas_limit`
    pub fn gas_policy(&self) -> StaticGasPolicy {
        StaticGasPolicy::new(U256::from(self.gas_price), U256::from(self.gas_limit))
    }

    /// Receipt polling settings
    pub fn poll_config(&self) -> Result<PollConfig, CliError> {
        if self.poll_interval_ms == 0 {
            return Err(CliError::Config("poll_interval_ms must be positive".to_string()));
        }
        Ok(PollConfig::new(
            Duration::from_millis(self.poll_interval_ms),
            Duration::from_secs(self.poll_timeout_secs),
        )?)
    }
}

fn parse_number(name: &str, value: &str) -> Result<u64, CliError> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Config(format!("{} is not a number: {}", name, value)))
}
