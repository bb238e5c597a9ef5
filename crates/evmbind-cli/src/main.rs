//! # evmbind-cli
//!
//! Command-line interface for the JYMToken ERC-20 contract.
//!
//! ## Usage
//!
//! ```bash
//! # Deploy the bundled token
//! EVMBIND_PRIVATE_KEY=0x... evmbind deploy
//!
//! # Token operations against a deployed address
//! evmbind --contract 0x5fbd... balance-of 0xf39F...
//! evmbind --contract 0x5fbd... transfer 0x7099... 500
//! evmbind --contract 0x5fbd... --json total-supply
//!
//! # Receipt lookup
//! evmbind receipt 0x...
//! ```

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod error;
mod output;

pub use config::Config;
pub use error::CliError;
pub use output::Output;

use commands::token::Metadata;

/// JYMToken CLI
#[derive(Parser, Debug)]
#[command(name = "evmbind")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// RPC endpoint URL
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Signing key (hex)
    #[arg(long, global = true)]
    private_key: Option<String>,

    /// Token contract address
    #[arg(long, global = true)]
    contract: Option<String>,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// CLI commands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Deploy the bundled token
    Deploy,
    /// Mint tokens to the signer
    Mint {
        /// Amount in the smallest unit
        amount: String,
    },
    /// Burn the signer's tokens
    Burn {
        /// Amount in the smallest unit
        amount: String,
    },
    /// Transfer tokens
    Transfer {
        /// Recipient address
        to: String,
        /// Amount in the smallest unit
        amount: String,
    },
    /// Approve a spender
    Approve {
        /// Spender address
        spender: String,
        /// Amount in the smallest unit
        amount: String,
    },
    /// Transfer tokens using an allowance
    TransferFrom {
        /// Owner address
        from: String,
        /// Recipient address
        to: String,
        /// Amount in the smallest unit
        amount: String,
    },
    /// Token balance of an address
    BalanceOf {
        /// Account address
        address: String,
    },
    /// Remaining allowance
    Allowance {
        /// Owner address
        owner: String,
        /// Spender address
        spender: String,
    },
    /// Total supply
    TotalSupply,
    /// Token name
    Name,
    /// Token symbol
    Symbol,
    /// Token decimals
    Decimals,
    /// Look up a transaction receipt, waiting up to the configured deadline
    Receipt {
        /// Transaction hash
        hash: String,
    },
    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let json = cli.json;
    if let Err(e) = run(cli).await {
        if json {
            println!(
                "{}",
                serde_json::json!({
                    "error": e.to_string(),
                    "success": false
                })
            );
            std::process::exit(1);
        }
        return Err(e.into());
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = Config::load()?;
    config.apply_env(|name| std::env::var(name).ok())?;

    if let Some(rpc_url) = cli.rpc_url {
        config.rpc_url = rpc_url;
    }
    if let Some(key) = cli.private_key {
        config.private_key = Some(key);
    }
    if let Some(contract) = cli.contract {
        config.contract_address = Some(contract);
    }

    let json = cli.json;
    match cli.command {
        Commands::Deploy => commands::token::deploy(&config, json).await,
        Commands::Mint { amount } => commands::token::mint(&config, &amount, json).await,
        Commands::Burn { amount } => commands::token::burn(&config, &amount, json).await,
        Commands::Transfer { to, amount } => commands::token::transfer(&config, &to, &amount, json).await,
        Commands::Approve { spender, amount } => {
            commands::token::approve(&config, &spender, &amount, json).await
        }
        Commands::TransferFrom { from, to, amount } => {
            commands::token::transfer_from(&config, &from, &to, &amount, json).await
        }
        Commands::BalanceOf { address } => commands::token::balance_of(&config, &address, json).await,
        Commands::Allowance { owner, spender } => {
            commands::token::allowance(&config, &owner, &spender, json).await
        }
        Commands::TotalSupply => commands::token::total_supply(&config, json).await,
        Commands::Name => commands::token::metadata(&config, Metadata::Name, json).await,
        Commands::Symbol => commands::token::metadata(&config, Metadata::Symbol, json).await,
        Commands::Decimals => commands::token::metadata(&config, Metadata::Decimals, json).await,
        Commands::Receipt { hash } => commands::receipt::receipt(&config, &hash, json).await,
        Commands::Config { show } => handle_config(&config, show, json),
    }
}

fn handle_config(config: &Config, show: bool, json: bool) -> Result<(), CliError> {
    if !show {
        Output::new(json)
            .message("Use --show to display the configuration")
            .print();
        return Ok(());
    }

    let path = Config::config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<none>".to_string());
    let contract = config.contract_address.as_deref().unwrap_or("<unset>");
    let chain_id = config
        .chain_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "<from node>".to_string());
    let key = if config.private_key.is_some() { "set" } else { "unset" };

    Output::new(json)
        .field("config_path", &path)
        .field("rpc_url", &config.rpc_url)
        .field_u64("gas_price", config.gas_price)
        .field_u64("gas_limit", config.gas_limit)
        .field_u64("poll_interval_ms", config.poll_interval_ms)
        .field_u64("poll_timeout_secs", config.poll_timeout_secs)
        .field("contract_address", contract)
        .field("chain_id", &chain_id)
        .field("private_key", key)
        .message(&format!(
            "Config file: {}\nRPC URL: {}\nGas price: {}\nGas limit: {}\nPoll: every {} ms, up to {} s\nContract: {}\nChain ID: {}\nPrivate key: {}",
            path,
            config.rpc_url,
            config.gas_price,
            config.gas_limit,
            config.poll_interval_ms,
            config.poll_timeout_secs,
            contract,
            chain_id,
            key
        ))
        .print();
    Ok(())
}
