//! Contract handle: descriptors + address + signer

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use evmbind_abi::AbiValue;
use evmbind_primitives::{Address, BlockNumber, U256};
use evmbind_types::{create_address, TransactionReceipt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::binary::ContractBinary;
use crate::call::{build_call_data, build_deploy_data, prepare, Route};
use crate::client::RpcClient;
use crate::decoder::{decode_event, decode_output, decode_revert, revert_error, DecodedEvent, RevertReason};
use crate::descriptor::{EventDescriptor, FunctionDescriptor};
use crate::registry::DescriptorSet;
use crate::tx_manager::{PollConfig, TransactionManager, TxPayload};
use crate::types::{BlockId, CallRequest, LogFilter};
use crate::SdkError;

/// Buffered events per subscription before the polling task waits for the reader
const SUBSCRIPTION_CAPACITY: usize = 64;

/// Result of [`ContractHandle::invoke`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// A read-only function's decoded output
    Value(AbiValue),
    /// A state-changing function's receipt
    Receipt(TransactionReceipt),
}

/// A deployed (or to-be-deployed) contract.
///
/// Created unbound; bound exactly once, by [`ContractHandle::deploy`] or
/// [`ContractHandle::load`]. Every call, send and event query on an unbound
/// handle fails with [`SdkError::NotBound`] before touching the network.
/// The handle is `Sync`; share it behind an `Arc` for concurrent use.
/// Deployments through one handle run one at a time.
pub struct ContractHandle {
    descriptors: Arc<DescriptorSet>,
    binary: Option<ContractBinary>,
    address: OnceLock<Address>,
    deploying: Mutex<()>,
    manager: Arc<TransactionManager>,
    poll: PollConfig,
}

impl ContractHandle {
    /// Create an unbound handle
    pub fn new(descriptors: DescriptorSet, manager: Arc<TransactionManager>, poll: PollConfig) -> Self {
        Self {
            descriptors: Arc::new(descriptors),
            binary: None,
            address: OnceLock::new(),
            deploying: Mutex::new(()),
            manager,
            poll,
        }
    }

    /// Attach the deployment binary
    pub fn with_binary(mut self, binary: ContractBinary) -> Self {
        self.binary = Some(binary);
        self
    }

    /// Bind to an existing deployment. No network request is made.
    pub fn load(&self, address: Address) -> Result<(), SdkError> {
        self.bind(address)?;
        info!(%address, "contract loaded");
        Ok(())
    }

    fn bind(&self, address: Address) -> Result<(), SdkError> {
        self.address.set(address).map_err(|_| match self.address.get() {
            Some(bound) => SdkError::AlreadyBound(*bound),
            None => SdkError::AlreadyBound(address),
        })
    }

    /// Deploy the attached binary with constructor `args`, wait for the
    /// receipt and bind to the new address.
    pub async fn deploy(&self, args: &[AbiValue]) -> Result<TransactionReceipt, SdkError> {
        self.deploy_with_value(args, U256::zero()).await
    }

    /// [`ContractHandle::deploy`] with value for a payable constructor
    pub async fn deploy_with_value(
        &self,
        args: &[AbiValue],
        value: U256,
    ) -> Result<TransactionReceipt, SdkError> {
        // held until bound, so a second deploy sees the address instead of broadcasting
        let _deploying = self.deploying.lock().await;
        if let Some(bound) = self.address.get() {
            return Err(SdkError::AlreadyBound(*bound));
        }
        let binary = self
            .binary
            .as_ref()
            .ok_or_else(|| SdkError::ArgumentMismatch("handle has no deployment binary".to_string()))?;
        let data = build_deploy_data(
            &binary.bytecode()?,
            self.descriptors.constructor_inputs(),
            args,
        )?;

        let payload = TxPayload::deploy(data).with_value(value);
        let (nonce, receipt) = self
            .manager
            .execute_tracked(payload, &self.descriptors, &self.poll)
            .await?;

        let address = match receipt.contract_address {
            Some(address) => address,
            None => {
                let derived = create_address(&self.manager.address(), nonce);
                debug!(%derived, nonce, "receipt has no contract address, derived from sender and nonce");
                derived
            }
        };
        self.bind(address)?;
        info!(%address, hash = %receipt.transaction_hash, "contract deployed");
        Ok(receipt)
    }

    /// Bound address
    pub fn address(&self) -> Result<Address, SdkError> {
        self.address.get().copied().ok_or(SdkError::NotBound)
    }

    /// Whether an address is bound
    pub fn is_bound(&self) -> bool {
        self.address.get().is_some()
    }

    /// Descriptor set
    pub fn descriptors(&self) -> &DescriptorSet {
        &self.descriptors
    }

    /// Signer address
    pub fn signer(&self) -> Address {
        self.manager.address()
    }

    /// RPC client
    pub fn client(&self) -> &RpcClient {
        self.manager.client()
    }

    /// Function descriptor by name
    pub fn function(&self, name: &str) -> Result<&FunctionDescriptor, SdkError> {
        self.descriptors
            .function(name)
            .ok_or_else(|| SdkError::UnknownFunction(name.to_string()))
    }

    /// Event descriptor by name
    pub fn event(&self, name: &str) -> Result<&EventDescriptor, SdkError> {
        self.descriptors
            .event(name)
            .ok_or_else(|| SdkError::UnknownEvent(name.to_string()))
    }

    // ==================== Calls ====================

    /// Read call at the latest block
    pub async fn call(&self, name: &str, args: &[AbiValue]) -> Result<AbiValue, SdkError> {
        self.call_at(name, args, BlockId::Latest).await
    }

    /// Read call at `block`. A revert is decoded against the handle's errors.
    pub async fn call_at(
        &self,
        name: &str,
        args: &[AbiValue],
        block: BlockId,
    ) -> Result<AbiValue, SdkError> {
        let address = self.address()?;
        let function = self.function(name)?;
        let data = build_call_data(function, args)?;

        let request = CallRequest {
            from: Some(self.signer()),
            to: Some(address),
            data: Some(data),
            ..Default::default()
        };
        let output = self
            .client()
            .call(&request, block)
            .await
            .map_err(|err| revert_error(&self.descriptors, err, None))?;
        decode_output(function, &output)
    }

    /// Send a transaction and wait for its receipt
    pub async fn send(&self, name: &str, args: &[AbiValue]) -> Result<TransactionReceipt, SdkError> {
        self.send_with_value(name, args, U256::zero()).await
    }

    /// Send with value; the function must be payable when `value` is non-zero
    pub async fn send_with_value(
        &self,
        name: &str,
        args: &[AbiValue],
        value: U256,
    ) -> Result<TransactionReceipt, SdkError> {
        let address = self.address()?;
        let function = self.function(name)?;
        if !value.is_zero() && !function.payable {
            return Err(SdkError::ArgumentMismatch(format!(
                "{} is not payable",
                function.name
            )));
        }
        let data = build_call_data(function, args)?;

        let payload = TxPayload::call(address, function.name.clone(), data).with_value(value);
        self.manager
            .execute(payload, &self.descriptors, &self.poll)
            .await
    }

    /// Read call for constant functions, transaction otherwise
    pub async fn invoke(&self, name: &str, args: &[AbiValue]) -> Result<Invocation, SdkError> {
        self.address()?;
        let prepared = prepare(self.function(name)?, args)?;
        match prepared.route {
            Route::Call => self.call(name, args).await.map(Invocation::Value),
            Route::Transaction => self.send(name, args).await.map(Invocation::Receipt),
        }
    }

    /// Decode revert data against this contract's errors
    pub fn decode_revert(&self, data: &[u8]) -> RevertReason {
        decode_revert(&self.descriptors, data)
    }

    // ==================== Events ====================

    /// Fetch and decode `name` events emitted by this contract between two blocks
    pub async fn query_events(
        &self,
        name: &str,
        from_block: BlockId,
        to_block: BlockId,
    ) -> Result<Vec<DecodedEvent>, SdkError> {
        let address = self.address()?;
        let event = self.event(name)?;
        let filter = LogFilter {
            address: Some(address),
            topic0: (!event.anonymous).then(|| event.topic()),
            from_block,
            to_block,
        };
        self.client()
            .get_logs(&filter)
            .await?
            .iter()
            .map(|log| decode_event(event, log))
            .collect()
    }

    /// Decode `name` events this contract emitted in `receipt`; logs of other
    /// contracts and other events are skipped
    pub fn events_in_receipt(
        &self,
        name: &str,
        receipt: &TransactionReceipt,
    ) -> Result<Vec<DecodedEvent>, SdkError> {
        let address = self.address()?;
        let event = self.event(name)?;
        let topic = event.topic();
        receipt
            .logs_from(&address)
            .filter(|log| event.anonymous || log.topic0() == Some(&topic))
            .map(|log| decode_event(event, log))
            .collect()
    }

    /// Follow `name` events from `from_block` on, polling every `interval`.
    ///
    /// Must be called within a Tokio runtime. A zero `interval` is an
    /// [`SdkError::ArgumentMismatch`].
    pub fn subscribe(
        &self,
        name: &str,
        from_block: BlockNumber,
        interval: Duration,
    ) -> Result<EventSubscription, SdkError> {
        if interval.is_zero() {
            return Err(SdkError::ArgumentMismatch(
                "subscription interval must be non-zero".to_string(),
            ));
        }
        let address = self.address()?;
        let event = self.event(name)?.clone();
        let client = self.client().clone();
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_CAPACITY);

        let task = tokio::spawn(poll_events(client, address, event, from_block, interval, sender));
        Ok(EventSubscription { receiver, task })
    }
}

async fn poll_events(
    client: RpcClient,
    address: Address,
    event: EventDescriptor,
    from_block: BlockNumber,
    interval: Duration,
    sender: mpsc::Sender<Result<DecodedEvent, SdkError>>,
) {
    let mut next_block = from_block;
    loop {
        let batch = match client.block_number().await {
            Ok(head) if head >= next_block => {
                let filter = LogFilter {
                    address: Some(address),
                    topic0: (!event.anonymous).then(|| event.topic()),
                    from_block: BlockId::Number(next_block),
                    to_block: BlockId::Number(head),
                };
                match client.get_logs(&filter).await {
                    Ok(logs) => {
                        next_block = head + 1;
                        logs.iter().map(|log| decode_event(&event, log)).collect()
                    }
                    Err(err) => vec![Err(err)],
                }
            }
            Ok(_) => Vec::new(),
            Err(err) => vec![Err(err)],
        };

        for item in batch {
            if sender.send(item).await.is_err() {
                return;
            }
        }
        tokio::time::sleep(interval).await;
    }
}

/// Live event feed; dropping it stops the polling task
pub struct EventSubscription {
    receiver: mpsc::Receiver<Result<DecodedEvent, SdkError>>,
    task: JoinHandle<()>,
}

impl EventSubscription {
    /// Next event, or a polling error. `None` once the task has stopped.
    pub async fn next(&mut self) -> Option<Result<DecodedEvent, SdkError>> {
        self.receiver.recv().await
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Deploy `binary` and return a handle bound to the new contract
pub async fn deploy(
    manager: Arc<TransactionManager>,
    descriptors: DescriptorSet,
    binary: ContractBinary,
    args: &[AbiValue],
    poll: PollConfig,
) -> Result<ContractHandle, SdkError> {
    let handle = ContractHandle::new(descriptors, manager, poll).with_binary(binary);
    handle.deploy(args).await?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Param;
    use crate::gas::StaticGasPolicy;
    use crate::transport::MockTransport;
    use evmbind_abi::{encode, AbiType};
    use evmbind_crypto::Credentials;
    use evmbind_primitives::H256;
    use serde_json::json;

    fn descriptors() -> DescriptorSet {
        DescriptorSet::builder()
            .function(FunctionDescriptor::constant(
                "balanceOf",
                vec![Param::new("account", AbiType::Address)],
                vec![AbiType::Uint(256)],
            ))
            .function(FunctionDescriptor::new(
                "transfer",
                vec![
                    Param::new("to", AbiType::Address),
                    Param::new("value", AbiType::Uint(256)),
                ],
                vec![AbiType::Bool],
            ))
            .event(EventDescriptor::new(
                "Transfer",
                vec![
                    Param::indexed("from", AbiType::Address),
                    Param::indexed("to", AbiType::Address),
                    Param::new("value", AbiType::Uint(256)),
                ],
            ))
            .build()
    }

    fn handle() -> (Arc<MockTransport>, ContractHandle) {
        let transport = Arc::new(MockTransport::new());
        let client = RpcClient::from_shared(transport.clone());
        let policy = Arc::new(StaticGasPolicy::new(U256::one(), U256::from(100_000u64)));
        let manager = Arc::new(TransactionManager::new(client, Credentials::random(), policy));
        let poll = PollConfig::new(Duration::from_millis(10), Duration::from_millis(100)).unwrap();
        (transport, ContractHandle::new(descriptors(), manager, poll))
    }

    fn transfer_log(token: Address, value: u64) -> serde_json::Value {
        let topic = descriptors().event("Transfer").unwrap().topic();
        let data = encode(&[AbiType::Uint(256)], &[AbiValue::from(value)]).unwrap();
        json!({
            "address": token.to_hex(),
            "topics": [
                topic.to_hex(),
                H256::from_address(&Address::from_bytes([1; 20])).to_hex(),
                H256::from_address(&Address::from_bytes([2; 20])).to_hex()
            ],
            "data": format!("0x{}", hex::encode(data)),
            "blockNumber": "0x100"
        })
    }

    #[tokio::test]
    async fn test_unbound_handle_never_reaches_network() {
        let (transport, handle) = handle();
        assert!(matches!(
            handle.call("balanceOf", &[AbiValue::Address(Address::ZERO)]).await,
            Err(SdkError::NotBound)
        ));
        assert!(matches!(
            handle.send("transfer", &[AbiValue::Address(Address::ZERO), AbiValue::from(1u64)]).await,
            Err(SdkError::NotBound)
        ));
        assert!(matches!(
            handle.query_events("Transfer", BlockId::Earliest, BlockId::Latest).await,
            Err(SdkError::NotBound)
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_load_binds_once() {
        let (transport, handle) = handle();
        let address = Address::from_bytes([7; 20]);
        handle.load(address).unwrap();
        assert_eq!(handle.address().unwrap(), address);
        assert!(matches!(
            handle.load(Address::from_bytes([8; 20])),
            Err(SdkError::AlreadyBound(a)) if a == address
        ));
        assert!(matches!(handle.deploy(&[]).await, Err(SdkError::AlreadyBound(_))));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_call_decodes_output() {
        let (transport, handle) = handle();
        handle.load(Address::from_bytes([7; 20])).unwrap();
        let encoded = encode(&[AbiType::Uint(256)], &[AbiValue::from(42u64)]).unwrap();
        transport.set_response("eth_call", json!(format!("0x{}", hex::encode(encoded))));

        let value = handle
            .call("balanceOf", &[AbiValue::Address(Address::ZERO)])
            .await
            .unwrap();
        assert_eq!(value, AbiValue::from(42u64));

        let request = &transport.requests_for("eth_call")[0];
        assert_eq!(request[0]["from"], handle.signer().to_hex());
        assert_eq!(request[1], "latest");
    }

    #[tokio::test]
    async fn test_argument_mismatch_before_network() {
        let (transport, handle) = handle();
        handle.load(Address::from_bytes([7; 20])).unwrap();
        assert!(matches!(
            handle.call("balanceOf", &[]).await,
            Err(SdkError::ArgumentMismatch(_))
        ));
        assert!(matches!(
            handle.call("nope", &[]).await,
            Err(SdkError::UnknownFunction(_))
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_call_revert_is_decoded() {
        let (transport, handle) = handle();
        handle.load(Address::from_bytes([7; 20])).unwrap();
        transport.push_rpc_error("eth_call", 3, "execution reverted", Some("0xdeadbeef"));

        match handle.call("balanceOf", &[AbiValue::Address(Address::ZERO)]).await {
            Err(SdkError::ContractReverted { transaction_hash: None, reason }) => {
                assert_eq!(reason, RevertReason::Raw(bytes::Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef])));
            }
            other => panic!("expected revert, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_payable_rejects_value() {
        let (transport, handle) = handle();
        handle.load(Address::from_bytes([7; 20])).unwrap();
        let result = handle
            .send_with_value(
                "transfer",
                &[AbiValue::Address(Address::ZERO), AbiValue::from(1u64)],
                U256::one(),
            )
            .await;
        assert!(matches!(result, Err(SdkError::ArgumentMismatch(_))));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_query_events_filters_by_address_and_topic() {
        let (transport, handle) = handle();
        let token = Address::from_bytes([7; 20]);
        handle.load(token).unwrap();
        transport.set_response("eth_getLogs", json!([transfer_log(token, 500)]));

        let events = handle
            .query_events("Transfer", BlockId::Number(1), BlockId::Latest)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].get("value"), Some(&AbiValue::from(500u64)));
        assert_eq!(events[0].block_number, Some(256));

        let filter = &transport.requests_for("eth_getLogs")[0][0];
        assert_eq!(filter["address"], token.to_hex());
        assert_eq!(filter["fromBlock"], "0x1");
        assert_eq!(
            filter["topics"][0],
            handle.event("Transfer").unwrap().topic().to_hex()
        );
    }

    #[tokio::test]
    async fn test_subscription_delivers_and_stops_on_drop() {
        let (transport, handle) = handle();
        let token = Address::from_bytes([7; 20]);
        handle.load(token).unwrap();
        transport.push_response("eth_getLogs", json!([transfer_log(token, 1), transfer_log(token, 2)]));

        let mut subscription = handle
            .subscribe("Transfer", 200, Duration::from_millis(5))
            .unwrap();
        let first = subscription.next().await.unwrap().unwrap();
        let second = subscription.next().await.unwrap().unwrap();
        assert_eq!(first.get("value"), Some(&AbiValue::from(1u64)));
        assert_eq!(second.get("value"), Some(&AbiValue::from(2u64)));

        let filter = &transport.requests_for("eth_getLogs")[0][0];
        assert_eq!(filter["fromBlock"], "0xc8");
        assert_eq!(filter["toBlock"], "0x100");
        drop(subscription);
    }

    #[tokio::test]
    async fn test_zero_subscription_interval_rejected() {
        let (transport, handle) = handle();
        handle.load(Address::from_bytes([7; 20])).unwrap();
        assert!(matches!(
            handle.subscribe("Transfer", 0, Duration::ZERO),
            Err(SdkError::ArgumentMismatch(_))
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_deploys_broadcast_once() {
        let (transport, handle) = handle();
        let handle = handle.with_binary(ContractBinary::from_bytes(&[0x60, 0x80, 0x60, 0x40]));
        let deployed = Address::from_bytes([9; 20]);
        transport.set_response(
            "eth_getTransactionReceipt",
            json!({
                "transactionHash": H256::from_bytes([0xab; 32]).to_hex(),
                "blockNumber": "0x1",
                "gasUsed": "0x5208",
                "status": "0x1",
                "contractAddress": deployed.to_hex(),
                "logs": []
            }),
        );

        let (first, second) = tokio::join!(handle.deploy(&[]), handle.deploy(&[]));
        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(SdkError::AlreadyBound(a)) if *a == deployed)));
        assert_eq!(transport.requests_for("eth_sendRawTransaction").len(), 1);
        assert_eq!(handle.address().unwrap(), deployed);
    }
}
