//! Transaction lifecycle: build, sign, broadcast, poll
//!
//! Nonces are tracked locally per manager. The first submission seeds the
//! counter from `eth_getTransactionCount(address, "pending")`; the counter is
//! guarded by an async mutex held from build through broadcast, so submissions
//! from one signer go out one at a time in strictly increasing nonce order.
//! The counter advances before the broadcast is awaited, so a submission
//! cancelled mid-broadcast does not hand its nonce to the next one. A failed
//! broadcast clears the counter and the next submission re-seeds it.
//!
//! Share one manager per signer (it is meant to live in an `Arc`); two managers
//! for the same key race on nonces.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use evmbind_crypto::Credentials;
use evmbind_primitives::{Address, Nonce, H256, U256};
use evmbind_types::{TransactionReceipt, TransactionRequest};
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::client::RpcClient;
use crate::decoder::{decode_revert, revert_error, revert_payload, RevertReason};
use crate::gas::{GasParams, GasPolicy};
use crate::registry::DescriptorSet;
use crate::types::{BlockId, CallRequest};
use crate::SdkError;

/// Receipt polling schedule. There is no default: every wait is bounded by
/// a deadline the caller chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    interval: Duration,
    timeout: Duration,
}

impl PollConfig {
    /// Create a polling schedule.
    ///
    /// # Errors
    ///
    /// [`SdkError::ArgumentMismatch`] for a zero `interval`
    pub fn new(interval: Duration, timeout: Duration) -> Result<Self, SdkError> {
        if interval.is_zero() {
            return Err(SdkError::ArgumentMismatch(
                "poll interval must be non-zero".to_string(),
            ));
        }
        Ok(Self { interval, timeout })
    }

    /// Pause between polls, never zero
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Give up after this long
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Lifecycle state of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Request assembled
    Built,
    /// Signed locally
    Signed,
    /// Accepted by the node
    Broadcast,
    /// Waiting for a receipt
    Pending,
    /// Receipt observed
    Mined {
        /// Execution succeeded
        success: bool,
    },
    /// No receipt before the deadline
    TimedOut,
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxState::Built => f.write_str("built"),
            TxState::Signed => f.write_str("signed"),
            TxState::Broadcast => f.write_str("broadcast"),
            TxState::Pending => f.write_str("pending"),
            TxState::Mined { success: true } => f.write_str("mined"),
            TxState::Mined { success: false } => f.write_str("mined (reverted)"),
            TxState::TimedOut => f.write_str("timed out"),
        }
    }
}

/// What to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxPayload {
    /// Recipient, `None` deploys `data`
    pub to: Option<Address>,
    /// Call data or deployment data
    pub data: Bytes,
    /// Wei to attach
    pub value: U256,
    /// Function name, passed to the gas policy
    pub function: Option<String>,
}

impl TxPayload {
    /// Call a contract function
    pub fn call(to: Address, function: impl Into<String>, data: Bytes) -> Self {
        Self {
            to: Some(to),
            data,
            value: U256::zero(),
            function: Some(function.into()),
        }
    }

    /// Deploy a contract
    pub fn deploy(data: Bytes) -> Self {
        Self {
            to: None,
            data,
            value: U256::zero(),
            function: None,
        }
    }

    /// Attach value
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// A broadcast transaction awaiting its receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransaction {
    /// Hash reported by the node
    pub hash: H256,
    /// Nonce it was signed with
    pub nonce: Nonce,
    /// Gas parameters it was signed with
    pub gas: GasParams,
}

/// Signs and submits transactions for one signer
pub struct TransactionManager {
    client: RpcClient,
    credentials: Credentials,
    gas_policy: Arc<dyn GasPolicy>,
    next_nonce: Mutex<Option<Nonce>>,
}

impl TransactionManager {
    /// Create a manager for `credentials`
    pub fn new(client: RpcClient, credentials: Credentials, gas_policy: Arc<dyn GasPolicy>) -> Self {
        Self {
            client,
            credentials,
            gas_policy,
            next_nonce: Mutex::new(None),
        }
    }

    /// Signer address
    pub fn address(&self) -> Address {
        self.credentials.address()
    }

    /// Underlying client
    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    /// Forget the local nonce; the next submission re-reads it from the node
    pub async fn reset_nonce(&self) {
        *self.next_nonce.lock().await = None;
    }

    /// Build, sign and broadcast. Returns once the node has accepted the
    /// payload; it does not wait for mining.
    ///
    /// # Errors
    ///
    /// - [`SdkError::NonceConflict`] when the node rejects the nonce
    /// - [`SdkError::Transport`] / [`SdkError::Rpc`] when broadcast fails
    pub async fn submit(&self, payload: TxPayload) -> Result<PendingTransaction, SdkError> {
        let gas = self.gas_policy.gas_params(payload.function.as_deref()).await?;
        let chain_id = self.client.chain_id().await?;
        let from = self.address();

        let mut next_nonce = self.next_nonce.lock().await;
        let nonce = match *next_nonce {
            Some(nonce) => nonce,
            None => {
                let nonce = self.client.transaction_count(&from, BlockId::Pending).await?;
                info!(%from, nonce, "nonce seeded from node");
                nonce
            }
        };
        let following = nonce
            .checked_add(1)
            .ok_or_else(|| SdkError::NonceConflict(format!("nonce {} cannot be followed", nonce)))?;

        let request = TransactionRequest {
            from,
            to: payload.to,
            nonce,
            gas_price: gas.gas_price,
            gas_limit: gas.gas_limit,
            value: payload.value,
            data: payload.data,
        };
        info!(
            state = %TxState::Built,
            nonce,
            function = payload.function.as_deref().unwrap_or("<deploy>"),
            "transaction built"
        );

        let signed = request.sign(chain_id, &self.credentials)?;
        info!(state = %TxState::Signed, nonce, hash = %signed.hash(), "transaction signed");

        // committed before the await: the node may hold this nonce even if
        // the future is dropped mid-broadcast
        *next_nonce = Some(following);
        match self.client.send_raw_transaction(&signed).await {
            Ok(hash) => {
                if hash != signed.hash() {
                    warn!(local = %signed.hash(), node = %hash, "node reported a different transaction hash");
                }
                info!(state = %TxState::Broadcast, nonce, hash = %hash, "transaction broadcast");
                Ok(PendingTransaction { hash, nonce, gas })
            }
            Err(err) => {
                *next_nonce = None;
                warn!(nonce, err = %err, "broadcast failed, nonce will be re-read");
                Err(classify_broadcast_error(err))
            }
        }
    }

    /// Single receipt poll; `None` while the transaction is not mined
    pub async fn get_receipt(&self, hash: &H256) -> Result<Option<TransactionReceipt>, SdkError> {
        self.client.get_receipt(hash).await
    }

    /// Poll until a receipt appears or `config.timeout` elapses
    pub async fn wait_for_receipt(
        &self,
        hash: &H256,
        config: &PollConfig,
    ) -> Result<TransactionReceipt, SdkError> {
        wait_for_receipt(&self.client, hash, config).await
    }

    /// Submit and wait; a mined revert is decoded against `descriptors`.
    ///
    /// # Errors
    ///
    /// - [`SdkError::ContractReverted`] when the node refuses the transaction
    ///   with a revert, or the receipt reports one
    /// - [`SdkError::TimedOut`] when no receipt arrives in time
    pub async fn execute(
        &self,
        payload: TxPayload,
        descriptors: &DescriptorSet,
        config: &PollConfig,
    ) -> Result<TransactionReceipt, SdkError> {
        self.execute_tracked(payload, descriptors, config)
            .await
            .map(|(_, receipt)| receipt)
    }

    /// [`TransactionManager::execute`], also returning the nonce used
    pub(crate) async fn execute_tracked(
        &self,
        payload: TxPayload,
        descriptors: &DescriptorSet,
        config: &PollConfig,
    ) -> Result<(Nonce, TransactionReceipt), SdkError> {
        let replay = CallRequest {
            from: Some(self.address()),
            to: payload.to,
            gas: None,
            gas_price: None,
            value: Some(payload.value),
            data: Some(payload.data.clone()),
        };

        let pending = self
            .submit(payload)
            .await
            .map_err(|err| revert_error(descriptors, err, None))?;
        let receipt = self.wait_for_receipt(&pending.hash, config).await?;
        if receipt.is_success() {
            return Ok((pending.nonce, receipt));
        }

        let replay = CallRequest {
            gas: Some(pending.gas.gas_limit),
            gas_price: Some(pending.gas.gas_price),
            ..replay
        };
        let reason = self.replay_revert(&replay, &receipt, descriptors).await;
        warn!(hash = %receipt.transaction_hash, %reason, "transaction reverted");
        Err(SdkError::ContractReverted {
            transaction_hash: Some(receipt.transaction_hash),
            reason,
        })
    }

    /// Re-run a reverted transaction as `eth_call` at its block to recover the
    /// revert data the receipt does not carry. A replay that does not revert
    /// yields an empty reason.
    async fn replay_revert(
        &self,
        request: &CallRequest,
        receipt: &TransactionReceipt,
        descriptors: &DescriptorSet,
    ) -> RevertReason {
        match self
            .client
            .call(request, BlockId::Number(receipt.block_number))
            .await
        {
            Ok(data) => {
                warn!(returned = data.len(), "replay of reverted transaction did not revert");
                RevertReason::Raw(Bytes::new())
            }
            Err(err) => match revert_payload(&err) {
                Some(payload) => decode_revert(descriptors, &payload),
                None => {
                    warn!(err = %err, "could not replay reverted transaction");
                    RevertReason::Raw(Bytes::new())
                }
            },
        }
    }
}

/// Poll `hash` every `config.interval` until mined or `config.timeout` has
/// passed. The last poll happens at the deadline.
pub async fn wait_for_receipt(
    client: &RpcClient,
    hash: &H256,
    config: &PollConfig,
) -> Result<TransactionReceipt, SdkError> {
    let deadline = Instant::now() + config.timeout();
    info!(state = %TxState::Pending, hash = %hash, "waiting for receipt");

    loop {
        if let Some(receipt) = client.get_receipt(hash).await? {
            info!(
                state = %TxState::Mined { success: receipt.is_success() },
                hash = %hash,
                block = receipt.block_number,
                gas_used = %receipt.gas_used,
                "receipt received"
            );
            return Ok(receipt);
        }

        let now = Instant::now();
        if now >= deadline {
            info!(state = %TxState::TimedOut, hash = %hash, "no receipt before deadline");
            return Err(SdkError::TimedOut {
                transaction_hash: *hash,
            });
        }
        sleep(config.interval().min(deadline - now)).await;
    }
}

fn classify_broadcast_error(err: SdkError) -> SdkError {
    match err {
        SdkError::Rpc { message, .. } if is_nonce_rejection(&message) => SdkError::NonceConflict(message),
        other => other,
    }
}

fn is_nonce_rejection(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("nonce") || message.contains("replacement transaction") || message.contains("already known")
}
