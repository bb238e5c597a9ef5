//! Scripted in-memory ledger hosting one ERC-20 token.
//!
//! Accepts raw signed transactions, enforces nonces, executes `mint`,
//! `transfer`, `approve` and `burn` against an in-memory balance table and
//! answers the read calls of the JYMToken descriptor table. Mining can be held
//! back to exercise receipt polling.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use evmbind_abi::{decode, encode, AbiType, AbiValue};
use evmbind_crypto::keccak256;
use evmbind_sdk::{
    erc20, Address, Credentials, Erc20Token, PollConfig, RpcClient, SdkError, StaticGasPolicy,
    TransactionManager, Transport, H256, U256,
};
use evmbind_types::{create_address, SignedTransaction};
use parking_lot::Mutex;
use serde_json::{json, Value};

pub const CHAIN_ID: u64 = 1337;

/// Hardhat's first development key
pub const DEPLOYER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub fn deployer() -> Credentials {
    Credentials::from_private_key_hex(DEPLOYER_KEY).unwrap()
}

pub fn initial_supply() -> U256 {
    U256::from_dec_str("1000000000000000000000000").unwrap()
}

pub fn poll() -> PollConfig {
    PollConfig::new(Duration::from_millis(10), Duration::from_secs(1)).unwrap()
}

#[derive(Default)]
struct LedgerState {
    block: u64,
    nonces: HashMap<Address, u64>,
    token: Option<Address>,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    total_supply: U256,
    receipts: HashMap<H256, Value>,
    held: VecDeque<(H256, Value)>,
    hold_mining: bool,
    logs: Vec<Value>,
}

struct Execution {
    success: bool,
    logs: Vec<(Vec<H256>, Vec<u8>)>,
    contract_address: Option<Address>,
}

/// The scripted ledger
#[derive(Default)]
pub struct Erc20Ledger {
    state: Mutex<LedgerState>,
}

impl Erc20Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep broadcast transactions pending until [`Erc20Ledger::mine_held`]
    pub fn hold_mining(&self) {
        self.state.lock().hold_mining = true;
    }

    /// Mine everything held back and resume immediate mining
    pub fn mine_held(&self) {
        let mut state = self.state.lock();
        state.hold_mining = false;
        while let Some((hash, receipt)) = state.held.pop_front() {
            state.receipts.insert(hash, receipt);
        }
    }

    pub fn balance(&self, account: &Address) -> U256 {
        self.state.lock().balances.get(account).copied().unwrap_or_default()
    }

    fn send_raw(&self, params: &[Value]) -> Result<Value, SdkError> {
        let raw = params
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| SdkError::InvalidResponse("missing raw transaction".into()))?;
        let raw = evmbind_primitives::decode_hex(raw)?;
        let tx = SignedTransaction::decode(&raw)?;
        if tx.chain_id() != CHAIN_ID {
            return Err(rpc_error(-32000, "invalid chain id"));
        }

        let mut state = self.state.lock();
        let expected = state.nonces.get(&tx.from()).copied().unwrap_or(0);
        if tx.nonce() < expected {
            return Err(rpc_error(-32000, "nonce too low"));
        }
        if tx.nonce() > expected {
            return Err(rpc_error(-32000, "nonce too high"));
        }
        state.nonces.insert(tx.from(), expected + 1);

        let execution = state.execute(&tx);
        state.block += 1;
        let hash = keccak256(&raw);
        let block = state.block;

        let logs: Vec<Value> = execution
            .logs
            .iter()
            .map(|(topics, data)| {
                json!({
                    "address": state.token.unwrap_or(Address::ZERO).to_hex(),
                    "topics": topics.iter().map(H256::to_hex).collect::<Vec<_>>(),
                    "data": format!("0x{}", hex::encode(data)),
                    "blockNumber": format!("{:#x}", block),
                    "transactionHash": hash.to_hex(),
                })
            })
            .collect();
        state.logs.extend(logs.iter().cloned());

        let receipt = json!({
            "transactionHash": hash.to_hex(),
            "blockNumber": format!("{:#x}", block),
            "gasUsed": "0xc350",
            "status": if execution.success { "0x1" } else { "0x0" },
            "contractAddress": execution.contract_address.map(|a| a.to_hex()),
            "logs": logs,
        });
        if state.hold_mining {
            state.held.push_back((hash, receipt));
        } else {
            state.receipts.insert(hash, receipt);
        }
        Ok(Value::String(hash.to_hex()))
    }

    fn call(&self, params: &[Value]) -> Result<Value, SdkError> {
        let request = params
            .first()
            .ok_or_else(|| SdkError::InvalidResponse("missing call object".into()))?;
        let from = request["from"]
            .as_str()
            .map(Address::from_hex)
            .transpose()?
            .unwrap_or(Address::ZERO);
        let to = request["to"].as_str().map(Address::from_hex).transpose()?;
        let data = evmbind_primitives::decode_hex(request["data"].as_str().unwrap_or("0x"))?;

        let state = self.state.lock();
        if to.is_none() || to != state.token || data.len() < 4 {
            return Ok(json!("0x"));
        }
        let (selector, body) = data.split_at(4);
        let output = state.read(&from, selector, body)?;
        Ok(Value::String(format!("0x{}", hex::encode(output))))
    }

    fn logs(&self, params: &[Value]) -> Value {
        let filter = &params[0];
        let state = self.state.lock();
        let matching: Vec<Value> = state
            .logs
            .iter()
            .filter(|log| filter["address"].is_null() || log["address"] == filter["address"])
            .filter(|log| filter["topics"][0].is_null() || log["topics"][0] == filter["topics"][0])
            .cloned()
            .collect();
        Value::Array(matching)
    }
}

fn selector_of(name: &str) -> [u8; 4] {
    erc20::descriptors().function(name).unwrap().selector()
}

fn rpc_error(code: i64, message: &str) -> SdkError {
    SdkError::Rpc {
        code,
        message: message.to_string(),
        data: None,
    }
}

fn transfer_topics(from: &Address, to: &Address) -> Vec<H256> {
    vec![
        erc20::descriptors().event("Transfer").unwrap().topic(),
        H256::from_address(from),
        H256::from_address(to),
    ]
}

fn uint_word(value: U256) -> Vec<u8> {
    encode(&[AbiType::Uint(256)], &[AbiValue::Uint(value)]).unwrap()
}

fn insufficient_balance(sender: &Address, balance: U256, needed: U256) -> Vec<u8> {
    let descriptors = erc20::descriptors();
    let error = descriptors
        .errors()
        .iter()
        .find(|e| e.name == "ERC20InsufficientBalance")
        .unwrap();
    let mut payload = error.selector().to_vec();
    payload.extend(
        encode(
            &error.input_types(),
            &[AbiValue::Address(*sender), AbiValue::Uint(balance), AbiValue::Uint(needed)],
        )
        .unwrap(),
    );
    payload
}

impl LedgerState {
    fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn execute(&mut self, tx: &SignedTransaction) -> Execution {
        let request = tx.request();
        let from = tx.from();
        let failed = Execution {
            success: false,
            logs: vec![],
            contract_address: None,
        };

        let Some(to) = request.to else {
            // the only deployable contract mints the initial supply to the deployer
            let address = create_address(&from, tx.nonce());
            self.token = Some(address);
            self.balances.insert(from, initial_supply());
            self.total_supply = initial_supply();
            return Execution {
                success: true,
                logs: vec![(transfer_topics(&Address::ZERO, &from), uint_word(initial_supply()))],
                contract_address: Some(address),
            };
        };
        if Some(to) != self.token || request.data.len() < 4 {
            return failed;
        }

        let (selector, body) = request.data.split_at(4);

        if selector == selector_of("mint") {
            let Some(args) = decode(&[AbiType::Uint(256)], body).ok() else { return failed };
            let amount = args[0].as_uint().unwrap();
            let held = self.balance_of(&from);
            self.balances.insert(from, held + amount);
            self.total_supply += amount;
            return Execution {
                success: true,
                logs: vec![(transfer_topics(&Address::ZERO, &from), uint_word(amount))],
                contract_address: None,
            };
        }
        if selector == selector_of("burn") {
            let Some(args) = decode(&[AbiType::Uint(256)], body).ok() else { return failed };
            let amount = args[0].as_uint().unwrap();
            let held = self.balance_of(&from);
            if held < amount {
                return failed;
            }
            self.balances.insert(from, held - amount);
            self.total_supply -= amount;
            return Execution {
                success: true,
                logs: vec![(transfer_topics(&from, &Address::ZERO), uint_word(amount))],
                contract_address: None,
            };
        }
        if selector == selector_of("transfer") {
            let Some(args) = decode(&[AbiType::Address, AbiType::Uint(256)], body).ok() else { return failed };
            let recipient = args[0].as_address().unwrap();
            let amount = args[1].as_uint().unwrap();
            let held = self.balance_of(&from);
            if held < amount {
                return failed;
            }
            self.balances.insert(from, held - amount);
            let received = self.balance_of(&recipient);
            self.balances.insert(recipient, received + amount);
            return Execution {
                success: true,
                logs: vec![(transfer_topics(&from, &recipient), uint_word(amount))],
                contract_address: None,
            };
        }
        if selector == selector_of("approve") {
            let Some(args) = decode(&[AbiType::Address, AbiType::Uint(256)], body).ok() else { return failed };
            let spender = args[0].as_address().unwrap();
            let amount = args[1].as_uint().unwrap();
            self.allowances.insert((from, spender), amount);
            let topics = vec![
                erc20::descriptors().event("Approval").unwrap().topic(),
                H256::from_address(&from),
                H256::from_address(&spender),
            ];
            return Execution {
                success: true,
                logs: vec![(topics, uint_word(amount))],
                contract_address: None,
            };
        }
        failed
    }

    fn read(&self, from: &Address, selector: &[u8], body: &[u8]) -> Result<Vec<u8>, SdkError> {
        let balance = |a: &Address| self.balance_of(a);

        if selector == selector_of("balanceOf") {
            let args = decode(&[AbiType::Address], body)?;
            return Ok(uint_word(balance(&args[0].as_address().unwrap())));
        }
        if selector == selector_of("totalSupply") {
            return Ok(uint_word(self.total_supply));
        }
        if selector == selector_of("decimals") {
            return Ok(uint_word(U256::from(18u64)));
        }
        if selector == selector_of("name") {
            return Ok(encode(&[AbiType::String], &[AbiValue::from("JYMToken")])?);
        }
        if selector == selector_of("symbol") {
            return Ok(encode(&[AbiType::String], &[AbiValue::from("JYM")])?);
        }
        if selector == selector_of("allowance") {
            let args = decode(&[AbiType::Address, AbiType::Address], body)?;
            let key = (args[0].as_address().unwrap(), args[1].as_address().unwrap());
            return Ok(uint_word(self.allowances.get(&key).copied().unwrap_or_default()));
        }
        if selector == selector_of("transfer") {
            let args = decode(&[AbiType::Address, AbiType::Uint(256)], body)?;
            let amount = args[1].as_uint().unwrap();
            if balance(from) < amount {
                return Err(SdkError::Rpc {
                    code: 3,
                    message: "execution reverted".to_string(),
                    data: Some(format!(
                        "0x{}",
                        hex::encode(insufficient_balance(from, balance(from), amount))
                    )),
                });
            }
            return Ok(encode(&[AbiType::Bool], &[AbiValue::Bool(true)])?);
        }
        Ok(Vec::new())
    }
}

#[async_trait]
impl Transport for Erc20Ledger {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        match method {
            "eth_chainId" => Ok(json!(format!("{:#x}", CHAIN_ID))),
            "eth_gasPrice" => Ok(json!("0x4a817c800")),
            "eth_blockNumber" => Ok(json!(format!("{:#x}", self.state.lock().block))),
            "eth_getTransactionCount" => {
                let address = Address::from_hex(params[0].as_str().unwrap_or_default())?;
                let nonce = self.state.lock().nonces.get(&address).copied().unwrap_or(0);
                Ok(json!(format!("{:#x}", nonce)))
            }
            "eth_sendRawTransaction" => self.send_raw(&params),
            "eth_getTransactionReceipt" => {
                let hash = H256::from_hex(params[0].as_str().unwrap_or_default())?;
                Ok(self.state.lock().receipts.get(&hash).cloned().unwrap_or(Value::Null))
            }
            "eth_call" => self.call(&params),
            "eth_getLogs" => Ok(self.logs(&params)),
            other => Err(rpc_error(-32601, &format!("Method not found: {}", other))),
        }
    }
}

/// Transaction manager over a shared ledger with a fixed gas policy
pub fn manager(ledger: &Arc<Erc20Ledger>, credentials: Credentials) -> Arc<TransactionManager> {
    let client = RpcClient::from_shared(ledger.clone());
    let gas = Arc::new(StaticGasPolicy::new(
        U256::from(20_000_000_000u64),
        U256::from(6_721_975u64),
    ));
    Arc::new(TransactionManager::new(client, credentials, gas))
}

/// Deploy the bundled token from the development account
pub async fn deployed_token(ledger: &Arc<Erc20Ledger>) -> Erc20Token {
    let token = Erc20Token::new(manager(ledger, deployer()), poll()).unwrap();
    token.deploy().await.unwrap();
    token
}
