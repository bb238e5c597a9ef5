//! Receipt lookup

use evmbind_sdk::tx_manager::wait_for_receipt;
use evmbind_sdk::RpcClient;

use super::parse_hash;
use crate::{config::Config, output::Output, CliError};

/// Poll once, then wait up to the configured deadline
pub async fn receipt(config: &Config, hash: &str, json: bool) -> Result<(), CliError> {
    let hash = parse_hash(hash)?;
    let client = RpcClient::http(&config.rpc_url);

    let receipt = match client.get_receipt(&hash).await? {
        Some(receipt) => receipt,
        None => wait_for_receipt(&client, &hash, &config.poll_config()?).await?,
    };

    let status = if receipt.is_success() { "success" } else { "reverted" };
    Output::new(json)
        .receipt(&receipt)
        .field_u64("logs", receipt.logs.len() as u64)
        .message(&format!(
            "Transaction: {}\nBlock: {}\nStatus: {}\nGas used: {}",
            receipt.transaction_hash, receipt.block_number, status, receipt.gas_used
        ))
        .print();
    Ok(())
}
