//! JYMToken: the ERC-20 (with EIP-2612 permit) descriptor table, its
//! compiled binary and a typed facade over [`ContractHandle`]

use std::sync::Arc;

use evmbind_abi::{AbiType, AbiValue};
use evmbind_primitives::{Address, H256, U256};
use evmbind_types::TransactionReceipt;

use crate::binary::ContractBinary;
use crate::contract::ContractHandle;
use crate::decoder::DecodedEvent;
use crate::descriptor::{CustomErrorDescriptor, EventDescriptor, FunctionDescriptor, Param};
use crate::registry::DescriptorSet;
use crate::tx_manager::{PollConfig, TransactionManager};
use crate::types::BlockId;
use crate::SdkError;

const JYM_TOKEN_BIN: &str = include_str!("JYMToken.bin");

fn param(name: &str, ty: AbiType) -> Param {
    Param::new(name, ty)
}

fn uint256() -> AbiType {
    AbiType::Uint(256)
}

fn bytes32() -> AbiType {
    AbiType::FixedBytes(32)
}

/// Functions, events and custom errors of the token
pub fn descriptors() -> DescriptorSet {
    use AbiType::{Address as Addr, Bool, Uint};

    let functions = vec![
        FunctionDescriptor::constant("DOMAIN_SEPARATOR", vec![], vec![bytes32()]),
        FunctionDescriptor::constant(
            "allowance",
            vec![param("owner", Addr), param("spender", Addr)],
            vec![uint256()],
        ),
        FunctionDescriptor::new(
            "approve",
            vec![param("spender", Addr), param("value", uint256())],
            vec![Bool],
        ),
        FunctionDescriptor::constant("balanceOf", vec![param("account", Addr)], vec![uint256()]),
        FunctionDescriptor::new("burn", vec![param("value", uint256())], vec![]),
        FunctionDescriptor::constant("decimals", vec![], vec![Uint(8)]),
        FunctionDescriptor::constant(
            "eip712Domain",
            vec![],
            vec![
                AbiType::FixedBytes(1),
                AbiType::String,
                AbiType::String,
                uint256(),
                Addr,
                bytes32(),
                AbiType::Array(Box::new(uint256())),
            ],
        ),
        FunctionDescriptor::new("mint", vec![param("value", uint256())], vec![]),
        FunctionDescriptor::constant("name", vec![], vec![AbiType::String]),
        FunctionDescriptor::constant("nonces", vec![param("owner", Addr)], vec![uint256()]),
        FunctionDescriptor::new(
            "permit",
            vec![
                param("owner", Addr),
                param("spender", Addr),
                param("value", uint256()),
                param("deadline", uint256()),
                param("v", Uint(8)),
                param("r", bytes32()),
                param("s", bytes32()),
            ],
            vec![],
        ),
        FunctionDescriptor::constant("symbol", vec![], vec![AbiType::String]),
        FunctionDescriptor::constant("totalSupply", vec![], vec![uint256()]),
        FunctionDescriptor::new(
            "transfer",
            vec![param("to", Addr), param("value", uint256())],
            vec![Bool],
        ),
        FunctionDescriptor::new(
            "transferFrom",
            vec![param("from", Addr), param("to", Addr), param("value", uint256())],
            vec![Bool],
        ),
    ];

    let events = vec![
        EventDescriptor::new(
            "Approval",
            vec![
                Param::indexed("owner", Addr),
                Param::indexed("spender", Addr),
                param("value", uint256()),
            ],
        ),
        EventDescriptor::new("EIP712DomainChanged", vec![]),
        EventDescriptor::new(
            "Transfer",
            vec![
                Param::indexed("from", Addr),
                Param::indexed("to", Addr),
                param("value", uint256()),
            ],
        ),
    ];

    let errors = vec![
        CustomErrorDescriptor::new("ECDSAInvalidSignature", vec![]),
        CustomErrorDescriptor::new("ECDSAInvalidSignatureLength", vec![param("length", uint256())]),
        CustomErrorDescriptor::new("ECDSAInvalidSignatureS", vec![param("s", bytes32())]),
        CustomErrorDescriptor::new(
            "ERC20InsufficientAllowance",
            vec![param("spender", Addr), param("allowance", uint256()), param("needed", uint256())],
        ),
        CustomErrorDescriptor::new(
            "ERC20InsufficientBalance",
            vec![param("sender", Addr), param("balance", uint256()), param("needed", uint256())],
        ),
        CustomErrorDescriptor::new("ERC20InvalidApprover", vec![param("approver", Addr)]),
        CustomErrorDescriptor::new("ERC20InvalidReceiver", vec![param("receiver", Addr)]),
        CustomErrorDescriptor::new("ERC20InvalidSender", vec![param("sender", Addr)]),
        CustomErrorDescriptor::new("ERC20InvalidSpender", vec![param("spender", Addr)]),
        CustomErrorDescriptor::new("ERC2612ExpiredSignature", vec![param("deadline", uint256())]),
        CustomErrorDescriptor::new(
            "ERC2612InvalidSigner",
            vec![param("signer", Addr), param("owner", Addr)],
        ),
        CustomErrorDescriptor::new(
            "InvalidAccountNonce",
            vec![param("account", Addr), param("currentNonce", uint256())],
        ),
        CustomErrorDescriptor::new("InvalidShortString", vec![]),
        CustomErrorDescriptor::new("StringTooLong", vec![param("str", AbiType::String)]),
    ];

    let mut builder = DescriptorSet::builder().constructor(vec![]);
    for function in functions {
        builder = builder.function(function);
    }
    for event in events {
        builder = builder.event(event);
    }
    for error in errors {
        builder = builder.error(error);
    }
    builder.build()
}

/// Compiled deployment bytecode. The constructor takes no arguments and
/// mints 1,000,000 × 10^18 to the deployer.
pub fn jym_token_binary() -> Result<ContractBinary, SdkError> {
    ContractBinary::parse(JYM_TOKEN_BIN)
}

/// The token's EIP-712 domain, as returned by `eip712Domain()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip712Domain {
    /// Bitmap of the fields in use
    pub fields: u8,
    /// Domain name
    pub name: String,
    /// Domain version
    pub version: String,
    /// Chain id
    pub chain_id: U256,
    /// Verifying contract
    pub verifying_contract: Address,
    /// Salt
    pub salt: H256,
    /// Extensions
    pub extensions: Vec<U256>,
}

/// A decoded `Transfer` event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferEvent {
    /// Sender, zero for mints
    pub from: Address,
    /// Receiver, zero for burns
    pub to: Address,
    /// Amount
    pub value: U256,
}

/// A decoded `Approval` event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalEvent {
    /// Token owner
    pub owner: Address,
    /// Approved spender
    pub spender: Address,
    /// New allowance
    pub value: U256,
}

/// Typed token operations
pub struct Erc20Token {
    handle: ContractHandle,
}

impl Erc20Token {
    /// Unbound token with the bundled binary; call [`Erc20Token::deploy`] or
    /// [`Erc20Token::load`] next
    pub fn new(manager: Arc<TransactionManager>, poll: PollConfig) -> Result<Self, SdkError> {
        let handle = ContractHandle::new(descriptors(), manager, poll).with_binary(jym_token_binary()?);
        Ok(Self { handle })
    }

    /// Wrap an existing handle built over [`descriptors`]
    pub fn from_handle(handle: ContractHandle) -> Self {
        Self { handle }
    }

    /// The underlying handle
    pub fn handle(&self) -> &ContractHandle {
        &self.handle
    }

    /// Deploy and bind; returns the token address
    pub async fn deploy(&self) -> Result<Address, SdkError> {
        self.handle.deploy(&[]).await?;
        self.handle.address()
    }

    /// Bind to a deployed token
    pub fn load(&self, address: Address) -> Result<(), SdkError> {
        self.handle.load(address)
    }

    /// Token address
    pub fn address(&self) -> Result<Address, SdkError> {
        self.handle.address()
    }

    // ==================== Queries ====================

    /// Token name
    pub async fn name(&self) -> Result<String, SdkError> {
        let value = self.handle.call("name", &[]).await?;
        into_string(value)
    }

    /// Token symbol
    pub async fn symbol(&self) -> Result<String, SdkError> {
        let value = self.handle.call("symbol", &[]).await?;
        into_string(value)
    }

    /// Decimal places
    pub async fn decimals(&self) -> Result<u8, SdkError> {
        let value = into_uint(self.handle.call("decimals", &[]).await?)?;
        Ok(value.low_u32() as u8)
    }

    /// Total supply
    pub async fn total_supply(&self) -> Result<U256, SdkError> {
        into_uint(self.handle.call("totalSupply", &[]).await?)
    }

    /// Balance of `account`
    pub async fn balance_of(&self, account: Address) -> Result<U256, SdkError> {
        into_uint(self.handle.call("balanceOf", &[account.into()]).await?)
    }

    /// Amount `spender` may move from `owner`
    pub async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, SdkError> {
        into_uint(
            self.handle
                .call("allowance", &[owner.into(), spender.into()])
                .await?,
        )
    }

    /// Permit nonce of `owner`
    pub async fn nonces(&self, owner: Address) -> Result<U256, SdkError> {
        into_uint(self.handle.call("nonces", &[owner.into()]).await?)
    }

    /// EIP-712 domain separator
    pub async fn domain_separator(&self) -> Result<H256, SdkError> {
        into_h256(self.handle.call("DOMAIN_SEPARATOR", &[]).await?)
    }

    /// EIP-712 domain fields
    pub async fn eip712_domain(&self) -> Result<Eip712Domain, SdkError> {
        let value = self.handle.call("eip712Domain", &[]).await?;
        let fields = match value {
            AbiValue::Tuple(fields) if fields.len() == 7 => fields,
            other => return Err(unexpected("eip712Domain tuple", &other)),
        };
        let mut it = fields.into_iter();
        let mut next = || it.next().ok_or_else(|| SdkError::MalformedAbiData("eip712Domain".into()));

        let flags = next()?;
        let flags = flags
            .as_bytes()
            .and_then(|b| b.first().copied())
            .ok_or_else(|| unexpected("bytes1", &flags))?;
        let name = into_string(next()?)?;
        let version = into_string(next()?)?;
        let chain_id = into_uint(next()?)?;
        let verifying_contract = into_address(next()?)?;
        let salt = into_h256(next()?)?;
        let extensions = match next()? {
            AbiValue::Array(items) => items.into_iter().map(into_uint).collect::<Result<_, _>>()?,
            other => return Err(unexpected("uint256[]", &other)),
        };

        Ok(Eip712Domain {
            fields: flags,
            name,
            version,
            chain_id,
            verifying_contract,
            salt,
            extensions,
        })
    }

    // ==================== Transactions ====================

    /// Mint `amount` to the signer
    pub async fn mint(&self, amount: U256) -> Result<TransactionReceipt, SdkError> {
        self.handle.send("mint", &[amount.into()]).await
    }

    /// Burn `amount` of the signer's tokens
    pub async fn burn(&self, amount: U256) -> Result<TransactionReceipt, SdkError> {
        self.handle.send("burn", &[amount.into()]).await
    }

    /// Transfer `amount` to `to`
    pub async fn transfer(&self, to: Address, amount: U256) -> Result<TransactionReceipt, SdkError> {
        self.handle.send("transfer", &[to.into(), amount.into()]).await
    }

    /// Allow `spender` to move `amount`
    pub async fn approve(&self, spender: Address, amount: U256) -> Result<TransactionReceipt, SdkError> {
        self.handle.send("approve", &[spender.into(), amount.into()]).await
    }

    /// Move `amount` from `from` to `to` using the signer's allowance
    pub async fn transfer_from(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<TransactionReceipt, SdkError> {
        self.handle
            .send("transferFrom", &[from.into(), to.into(), amount.into()])
            .await
    }

    /// Set an allowance from an off-chain EIP-2612 signature
    #[allow(clippy::too_many_arguments)]
    pub async fn permit(
        &self,
        owner: Address,
        spender: Address,
        value: U256,
        deadline: U256,
        v: u8,
        r: H256,
        s: H256,
    ) -> Result<TransactionReceipt, SdkError> {
        let args = [
            owner.into(),
            spender.into(),
            value.into(),
            deadline.into(),
            AbiValue::Uint(U256::from(v)),
            AbiValue::bytes32(r),
            AbiValue::bytes32(s),
        ];
        self.handle.send("permit", &args).await
    }

    // ==================== Events ====================

    /// `Transfer` events this token emitted in `receipt`
    pub fn transfer_events(&self, receipt: &TransactionReceipt) -> Result<Vec<TransferEvent>, SdkError> {
        self.handle
            .events_in_receipt("Transfer", receipt)?
            .iter()
            .map(transfer_event)
            .collect()
    }

    /// `Approval` events this token emitted in `receipt`
    pub fn approval_events(&self, receipt: &TransactionReceipt) -> Result<Vec<ApprovalEvent>, SdkError> {
        self.handle
            .events_in_receipt("Approval", receipt)?
            .iter()
            .map(|event| {
                let (owner, spender, value) = address_pair_and_value(event, "owner", "spender")?;
                Ok(ApprovalEvent { owner, spender, value })
            })
            .collect()
    }

    /// `Transfer` events between two blocks
    pub async fn query_transfers(
        &self,
        from_block: BlockId,
        to_block: BlockId,
    ) -> Result<Vec<TransferEvent>, SdkError> {
        self.handle
            .query_events("Transfer", from_block, to_block)
            .await?
            .iter()
            .map(transfer_event)
            .collect()
    }
}

fn transfer_event(event: &DecodedEvent) -> Result<TransferEvent, SdkError> {
    let (from, to, value) = address_pair_and_value(event, "from", "to")?;
    Ok(TransferEvent { from, to, value })
}

fn address_pair_and_value(
    event: &DecodedEvent,
    first: &str,
    second: &str,
) -> Result<(Address, Address, U256), SdkError> {
    let field = |name: &str| {
        event
            .get(name)
            .cloned()
            .ok_or_else(|| SdkError::MalformedAbiData(format!("{} has no field {}", event.name, name)))
    };
    Ok((
        into_address(field(first)?)?,
        into_address(field(second)?)?,
        into_uint(field("value")?)?,
    ))
}

fn unexpected(expected: &str, got: &AbiValue) -> SdkError {
    SdkError::MalformedAbiData(format!("expected {}, got {}", expected, got))
}

fn into_uint(value: AbiValue) -> Result<U256, SdkError> {
    value.as_uint().ok_or_else(|| unexpected("uint", &value))
}

fn into_address(value: AbiValue) -> Result<Address, SdkError> {
    value.as_address().ok_or_else(|| unexpected("address", &value))
}

fn into_string(value: AbiValue) -> Result<String, SdkError> {
    match value {
        AbiValue::String(s) => Ok(s),
        other => Err(unexpected("string", &other)),
    }
}

fn into_h256(value: AbiValue) -> Result<H256, SdkError> {
    match &value {
        AbiValue::FixedBytes(bytes) if bytes.len() == 32 => Ok(H256::from_slice(bytes)?),
        _ => Err(unexpected("bytes32", &value)),
    }
}
