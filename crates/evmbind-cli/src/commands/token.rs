//! Token commands

use evmbind_sdk::TransactionReceipt;
use serde_json::{json, Value};
use tracing::info;

use super::{parse_address, parse_amount, Session};
use crate::{config::Config, output::Output, CliError};

/// Deploy the bundled token from the configured key
pub async fn deploy(config: &Config, json: bool) -> Result<(), CliError> {
    let session = Session::open(config, true).await?;
    let address = session.token.deploy().await?;
    info!(%address, "token deployed");

    Output::new(json)
        .field("contract_address", &address.to_hex())
        .field("deployer", &session.signer.to_hex())
        .message(&format!(
            "Token deployed at {}\nSet EVMBIND_CONTRACT={} to use it",
            address, address
        ))
        .print();
    Ok(())
}

/// `mint <amount>`
pub async fn mint(config: &Config, amount: &str, json: bool) -> Result<(), CliError> {
    let amount = parse_amount(amount)?;
    let session = Session::open(config, true).await?.bind(config)?;
    let receipt = session.token.mint(amount).await?;
    print_receipt(&session, &receipt, &format!("Minted {}", amount), json)
}

/// `burn <amount>`
pub async fn burn(config: &Config, amount: &str, json: bool) -> Result<(), CliError> {
    let amount = parse_amount(amount)?;
    let session = Session::open(config, true).await?.bind(config)?;
    let receipt = session.token.burn(amount).await?;
    print_receipt(&session, &receipt, &format!("Burned {}", amount), json)
}

/// `transfer <to> <amount>`
pub async fn transfer(config: &Config, to: &str, amount: &str, json: bool) -> Result<(), CliError> {
    let to = parse_address(to)?;
    let amount = parse_amount(amount)?;
    let session = Session::open(config, true).await?.bind(config)?;
    let receipt = session.token.transfer(to, amount).await?;
    print_receipt(&session, &receipt, &format!("Transferred {} to {}", amount, to), json)
}

/// `approve <spender> <amount>`
pub async fn approve(config: &Config, spender: &str, amount: &str, json: bool) -> Result<(), CliError> {
    let spender = parse_address(spender)?;
    let amount = parse_amount(amount)?;
    let session = Session::open(config, true).await?.bind(config)?;
    let receipt = session.token.approve(spender, amount).await?;
    print_receipt(&session, &receipt, &format!("Approved {} for {}", amount, spender), json)
}

/// `transfer-from <from> <to> <amount>`
pub async fn transfer_from(
    config: &Config,
    from: &str,
    to: &str,
    amount: &str,
    json: bool,
) -> Result<(), CliError> {
    let from = parse_address(from)?;
    let to = parse_address(to)?;
    let amount = parse_amount(amount)?;
    let session = Session::open(config, true).await?.bind(config)?;
    let receipt = session.token.transfer_from(from, to, amount).await?;
    print_receipt(
        &session,
        &receipt,
        &format!("Transferred {} from {} to {}", amount, from, to),
        json,
    )
}

/// `balance-of <address>`
pub async fn balance_of(config: &Config, account: &str, json: bool) -> Result<(), CliError> {
    let account = parse_address(account)?;
    let session = Session::open(config, false).await?.bind(config)?;
    let balance = session.token.balance_of(account).await?;

    Output::new(json)
        .field("address", &account.to_hex())
        .field_u256("balance", &balance)
        .message(&balance.to_string())
        .print();
    Ok(())
}

/// `allowance <owner> <spender>`
pub async fn allowance(config: &Config, owner: &str, spender: &str, json: bool) -> Result<(), CliError> {
    let owner = parse_address(owner)?;
    let spender = parse_address(spender)?;
    let session = Session::open(config, false).await?.bind(config)?;
    let allowance = session.token.allowance(owner, spender).await?;

    Output::new(json)
        .field("owner", &owner.to_hex())
        .field("spender", &spender.to_hex())
        .field_u256("allowance", &allowance)
        .message(&allowance.to_string())
        .print();
    Ok(())
}

/// `total-supply`
pub async fn total_supply(config: &Config, json: bool) -> Result<(), CliError> {
    let session = Session::open(config, false).await?.bind(config)?;
    let supply = session.token.total_supply().await?;

    Output::new(json)
        .field_u256("total_supply", &supply)
        .message(&supply.to_string())
        .print();
    Ok(())
}

/// Which metadata string to read
#[derive(Debug, Clone, Copy)]
pub enum Metadata {
    Name,
    Symbol,
    Decimals,
}

/// `name`, `symbol` and `decimals`
pub async fn metadata(config: &Config, which: Metadata, json: bool) -> Result<(), CliError> {
    let session = Session::open(config, false).await?.bind(config)?;
    let (key, value) = match which {
        Metadata::Name => ("name", session.token.name().await?),
        Metadata::Symbol => ("symbol", session.token.symbol().await?),
        Metadata::Decimals => ("decimals", session.token.decimals().await?.to_string()),
    };

    Output::new(json).field(key, &value).message(&value).print();
    Ok(())
}

fn print_receipt(
    session: &Session,
    receipt: &TransactionReceipt,
    summary: &str,
    json: bool,
) -> Result<(), CliError> {
    let transfers: Vec<Value> = session
        .token
        .transfer_events(receipt)?
        .iter()
        .map(|t| json!({ "from": t.from.to_hex(), "to": t.to.to_hex(), "value": t.value.to_string() }))
        .collect();

    Output::new(json)
        .receipt(receipt)
        .field_value("transfers", Value::Array(transfers))
        .message(&format!(
            "{}\nTransaction: {}\nBlock: {}",
            summary, receipt.transaction_hash, receipt.block_number
        ))
        .print();
    Ok(())
}
