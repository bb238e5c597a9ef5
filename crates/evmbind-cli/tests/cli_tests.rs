//! CLI integration tests for evmbind-cli
//!
//! Tests command parsing, config display and argument validation. Nothing here
//! reaches a node.

use std::process::Command;

const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const TOKEN: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

/// Run the CLI with an empty home directory and no `EVMBIND_*` variables
fn run_evmbind(args: &[&str]) -> std::process::Output {
    let home = tempfile::tempdir().expect("Failed to create temp dir");
    Command::new(env!("CARGO_BIN_EXE_evmbind"))
        .args(args)
        .env("HOME", home.path())
        .env_remove("EVMBIND_RPC_URL")
        .env_remove("EVMBIND_PRIVATE_KEY")
        .env_remove("EVMBIND_GAS_PRICE")
        .env_remove("EVMBIND_GAS_LIMIT")
        .env_remove("EVMBIND_CONTRACT")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

// ==================== Help & Version Tests ====================

#[test]
fn test_cli_help() {
    let output = run_evmbind(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in [
        "deploy",
        "mint",
        "transfer",
        "balance-of",
        "approve",
        "transfer-from",
        "burn",
        "allowance",
        "total-supply",
        "decimals",
        "receipt",
        "config",
    ] {
        assert!(stdout.contains(command), "help is missing {}", command);
    }
}

#[test]
fn test_cli_version() {
    let output = run_evmbind(&["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("evmbind"));
}

#[test]
fn test_global_flags_listed() {
    let output = run_evmbind(&["transfer", "--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--rpc-url"));
    assert!(stdout.contains("--private-key"));
    assert!(stdout.contains("--contract"));
    assert!(stdout.contains("--json"));
}

#[test]
fn test_transfer_requires_arguments() {
    let output = run_evmbind(&["transfer"]);
    assert!(!output.status.success());
}

// ==================== Config Tests ====================

#[test]
fn test_config_show_defaults() {
    let output = run_evmbind(&["config", "--show"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("http://localhost:8545"));
    assert!(stdout.contains("6721975"));
}

#[test]
fn test_config_show_json() {
    let output = run_evmbind(&["--json", "--rpc-url", "http://node:9545", "config", "--show"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);

    let json: serde_json::Value = serde_json::from_str(&stdout).expect("Invalid JSON");
    assert_eq!(json["rpc_url"], "http://node:9545");
    assert_eq!(json["gas_price"], 20_000_000_000u64);
    assert_eq!(json["poll_timeout_secs"], 120);
    assert_eq!(json["private_key"], "unset");
}

#[test]
fn test_config_show_hides_key() {
    let output = run_evmbind(&["--json", "--private-key", DEV_KEY, "config", "--show"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains(&DEV_KEY[2..]));

    let json: serde_json::Value = serde_json::from_str(&stdout).expect("Invalid JSON");
    assert_eq!(json["private_key"], "set");
}

// ==================== Validation Tests ====================

#[test]
fn test_invalid_amount_rejected() {
    let output = run_evmbind(&["--private-key", DEV_KEY, "--contract", TOKEN, "mint", "1.5"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid amount"));
}

#[test]
fn test_invalid_address_rejected() {
    let output = run_evmbind(&["--contract", TOKEN, "balance-of", "not-an-address"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid address"));
}

#[test]
fn test_missing_contract_reported_as_json() {
    let output = run_evmbind(&["--json", "total-supply"]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);

    let json: serde_json::Value = serde_json::from_str(&stdout).expect("Invalid JSON");
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("No contract address"));
}

#[test]
fn test_invalid_hash_rejected() {
    let output = run_evmbind(&["receipt", "0x1234"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid hash"));
}
