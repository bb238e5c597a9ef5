//! Subcommand implementations

pub mod receipt;
pub mod token;

use std::sync::Arc;

use evmbind_sdk::{Address, Credentials, Erc20Token, RpcClient, TransactionManager, H256, U256};
use tracing::debug;

use crate::{config::Config, CliError};

/// A connected token handle built from the configuration
pub struct Session {
    pub token: Erc20Token,
    pub signer: Address,
}

impl Session {
    /// Connect to the node. Without `signing`, a missing key is replaced by a
    /// throwaway one, which is enough for `eth_call`.
    pub async fn open(config: &Config, signing: bool) -> Result<Self, CliError> {
        let credentials = match config.credentials() {
            Ok(credentials) => credentials,
            Err(CliError::MissingKey) if !signing => Credentials::random(),
            Err(e) => return Err(e),
        };
        let signer = credentials.address();

        let client = RpcClient::http(&config.rpc_url);
        if signing {
            check_chain(&client, config.chain_id).await?;
        }

        let manager = TransactionManager::new(client, credentials, Arc::new(config.gas_policy()));
        let token = Erc20Token::new(Arc::new(manager), config.poll_config()?)?;
        debug!(rpc_url = %config.rpc_url, %signer, signing, "session ready");
        Ok(Self { token, signer })
    }

    /// Bind to the configured token address
    pub fn bind(self, config: &Config) -> Result<Self, CliError> {
        let address = config.contract()?.ok_or(CliError::MissingContract)?;
        self.token.load(address)?;
        Ok(self)
    }
}

async fn check_chain(client: &RpcClient, expected: Option<u64>) -> Result<(), CliError> {
    let actual = client.chain_id().await?;
    match expected {
        Some(expected) if expected != actual => Err(CliError::ChainMismatch { expected, actual }),
        _ => Ok(()),
    }
}

/// Parse a 0x-prefixed address
pub fn parse_address(s: &str) -> Result<Address, CliError> {
    Address::from_hex(s).map_err(|e| CliError::InvalidAddress(format!("{}: {}", s, e)))
}

/// Parse a decimal amount in the token's smallest unit
pub fn parse_amount(s: &str) -> Result<U256, CliError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CliError::InvalidAmount(s.to_string()));
    }
    U256::from_dec_str(s).map_err(|e| CliError::InvalidAmount(format!("{}: {:?}", s, e)))
}

/// Parse a 32-byte transaction hash
pub fn parse_hash(s: &str) -> Result<H256, CliError> {
    H256::from_hex(s).map_err(|e| CliError::InvalidHash(format!("{}: {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("500").unwrap(), U256::from(500u64));
        assert_eq!(
            parse_amount("1000000000000000000000000").unwrap(),
            U256::from(10u64).pow(U256::from(24u64))
        );
        assert!(parse_amount("").is_err());
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("1.5").is_err());
        assert!(parse_amount("0x10").is_err());
    }

    #[test]
    fn test_parse_address() {
        assert!(parse_address("0x5fbdb2315678afecb367f032d93f642f64180aa3").is_ok());
        assert!(matches!(parse_address("0x1234"), Err(CliError::InvalidAddress(_))));
    }

    #[test]
    fn test_parse_hash() {
        let hash = format!("0x{}", "ab".repeat(32));
        assert!(parse_hash(&hash).is_ok());
        assert!(matches!(parse_hash("0xabcd"), Err(CliError::InvalidHash(_))));
    }
}
