//! Response decoder: call outputs, event logs and revert payloads

use std::fmt;

use bytes::Bytes;
use evmbind_abi::{decode, AbiType, AbiValue};
use evmbind_primitives::{Address, BlockNumber, H256, U256};
use evmbind_types::LogRecord;
use serde_json::Value;
use tracing::warn;

use crate::descriptor::{EventDescriptor, FunctionDescriptor};
use crate::registry::DescriptorSet;
use crate::SdkError;

/// Selector of `Error(string)`
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Selector of `Panic(uint256)`
pub const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

// ==================== Call Outputs ====================

/// Decode the return data of `function`.
///
/// A single output is returned bare, several outputs as an ordered
/// [`AbiValue::Tuple`], no outputs as an empty tuple.
pub fn decode_output(function: &FunctionDescriptor, data: &[u8]) -> Result<AbiValue, SdkError> {
    let mut values = decode(&function.outputs, data)?;
    if values.len() == 1 {
        if let Some(value) = values.pop() {
            return Ok(value);
        }
    }
    Ok(AbiValue::Tuple(values))
}

// ==================== Events ====================

/// A decoded event parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedParam {
    /// Parameter name
    pub name: String,
    /// Decoded value; for `hashed` parameters the 32-byte topic as `bytes32`
    pub value: AbiValue,
    /// Read from a topic
    pub indexed: bool,
    /// Indexed reference type stored as its keccak256 hash; the original value
    /// cannot be recovered from the log
    pub hashed: bool,
}

/// A decoded event log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    /// Event name
    pub name: String,
    /// Parameters in declaration order
    pub params: Vec<DecodedParam>,
    /// Emitting contract
    pub address: Address,
    /// Block of the log, when known
    pub block_number: Option<BlockNumber>,
    /// Transaction of the log, when known
    pub transaction_hash: Option<H256>,
}

impl DecodedEvent {
    /// Value of the named parameter
    pub fn get(&self, name: &str) -> Option<&AbiValue> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Values in declaration order
    pub fn values(&self) -> Vec<AbiValue> {
        self.params.iter().map(|p| p.value.clone()).collect()
    }
}

/// Indexed arrays, tuples, strings and bytes are stored as a hash
fn stored_as_hash(ty: &AbiType) -> bool {
    matches!(
        ty,
        AbiType::String
            | AbiType::Bytes
            | AbiType::Array(_)
            | AbiType::FixedArray(..)
            | AbiType::Tuple(_)
    )
}

/// Decode `log` as an instance of `event`.
///
/// # Errors
///
/// - [`SdkError::EventMismatch`] when topic0 is not the event's topic; checked
///   before anything else is decoded
/// - [`SdkError::MalformedAbiData`] when the topic count or data does not fit
pub fn decode_event(event: &EventDescriptor, log: &LogRecord) -> Result<DecodedEvent, SdkError> {
    let mut topics = log.topics.iter();
    if !event.anonymous {
        match topics.next() {
            Some(topic0) if *topic0 == event.topic() => {}
            _ => return Err(SdkError::EventMismatch(event.name.clone())),
        }
    }

    if log.topics.len() != event.topic_count() {
        return Err(SdkError::MalformedAbiData(format!(
            "{} expects {} topics, log has {}",
            event.name,
            event.topic_count(),
            log.topics.len()
        )));
    }

    let data_types: Vec<AbiType> = event
        .params
        .iter()
        .filter(|p| !p.indexed)
        .map(|p| p.ty.clone())
        .collect();
    let mut data_values = decode(&data_types, &log.data)?.into_iter();

    let mut params = Vec::with_capacity(event.params.len());
    for param in &event.params {
        let decoded = if param.indexed {
            let topic = topics
                .next()
                .ok_or_else(|| SdkError::MalformedAbiData("missing topic".to_string()))?;
            if stored_as_hash(&param.ty) {
                DecodedParam {
                    name: param.name.clone(),
                    value: AbiValue::bytes32(*topic),
                    indexed: true,
                    hashed: true,
                }
            } else {
                let value = decode(std::slice::from_ref(&param.ty), topic.as_bytes())?
                    .pop()
                    .ok_or_else(|| SdkError::MalformedAbiData("empty topic decode".to_string()))?;
                DecodedParam {
                    name: param.name.clone(),
                    value,
                    indexed: true,
                    hashed: false,
                }
            }
        } else {
            let value = data_values
                .next()
                .ok_or_else(|| SdkError::MalformedAbiData("missing data value".to_string()))?;
            DecodedParam {
                name: param.name.clone(),
                value,
                indexed: false,
                hashed: false,
            }
        };
        params.push(decoded);
    }

    Ok(DecodedEvent {
        name: event.name.clone(),
        params,
        address: log.address,
        block_number: log.block_number,
        transaction_hash: log.transaction_hash,
    })
}

// ==================== Reverts ====================

/// Why a call or transaction reverted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertReason {
    /// A registered custom error
    Custom {
        /// Error name
        name: String,
        /// Named fields in declaration order
        params: Vec<(String, AbiValue)>,
    },
    /// `Error(string)`, from `require`/`revert` with a message
    Message(String),
    /// `Panic(uint256)`, from a failed `assert` or checked arithmetic
    Panic {
        /// Panic code
        code: U256,
        /// Description of the code
        meaning: &'static str,
    },
    /// Undecoded payload, possibly empty
    Raw(Bytes),
}

impl RevertReason {
    /// Custom error name, if decoded as one
    pub fn error_name(&self) -> Option<&str> {
        match self {
            RevertReason::Custom { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Named field of a custom error
    pub fn param(&self, field: &str) -> Option<&AbiValue> {
        match self {
            RevertReason::Custom { params, .. } => {
                params.iter().find(|(n, _)| n == field).map(|(_, v)| v)
            }
            _ => None,
        }
    }
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevertReason::Custom { name, params } => {
                let fields: Vec<String> = params
                    .iter()
                    .map(|(n, v)| if n.is_empty() { v.to_string() } else { format!("{}: {}", n, v) })
                    .collect();
                write!(f, "{}({})", name, fields.join(", "))
            }
            RevertReason::Message(msg) => write!(f, "Error(\"{}\")", msg),
            RevertReason::Panic { code, meaning } => write!(f, "Panic({:#x}): {}", code, meaning),
            RevertReason::Raw(data) if data.is_empty() => f.write_str("no revert data"),
            RevertReason::Raw(data) => write!(f, "0x{}", hex::encode(data)),
        }
    }
}

/// Map a Solidity panic code to a description
pub fn panic_meaning(code: &U256) -> &'static str {
    if code.bits() > 8 {
        return "unknown panic code";
    }
    match code.low_u32() {
        0x00 => "generic compiler-inserted panic",
        0x01 => "assertion failed",
        0x11 => "arithmetic overflow or underflow",
        0x12 => "division or modulo by zero",
        0x21 => "invalid enum value",
        0x22 => "corrupted storage byte array",
        0x31 => "pop on empty array",
        0x32 => "array index out of bounds",
        0x41 => "out of memory",
        0x51 => "call to zero-initialized function pointer",
        _ => "unknown panic code",
    }
}

/// Decode a revert payload against the registered custom errors, then the
/// compiler's `Error(string)` and `Panic(uint256)`.
///
/// Never fails: anything unrecognised, or a recognised selector whose body
/// does not decode, is returned as [`RevertReason::Raw`] with the bytes intact.
pub fn decode_revert(descriptors: &DescriptorSet, data: &[u8]) -> RevertReason {
    if data.len() < 4 {
        return RevertReason::Raw(Bytes::copy_from_slice(data));
    }
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&data[..4]);
    let body = &data[4..];

    if let Some(error) = descriptors.error_by_selector(&selector) {
        return match decode(&error.input_types(), body) {
            Ok(values) => RevertReason::Custom {
                name: error.name.clone(),
                params: error
                    .inputs
                    .iter()
                    .map(|p| p.name.clone())
                    .zip(values)
                    .collect(),
            },
            Err(e) => {
                warn!(error = %error.name, err = %e, "revert body does not match registered error");
                RevertReason::Raw(Bytes::copy_from_slice(data))
            }
        };
    }

    if selector == ERROR_STRING_SELECTOR {
        if let Ok(mut values) = decode(&[AbiType::String], body) {
            if let Some(AbiValue::String(msg)) = values.pop() {
                return RevertReason::Message(msg);
            }
        }
    } else if selector == PANIC_SELECTOR {
        if let Ok(mut values) = decode(&[AbiType::Uint(256)], body) {
            if let Some(AbiValue::Uint(code)) = values.pop() {
                return RevertReason::Panic {
                    code,
                    meaning: panic_meaning(&code),
                };
            }
        }
    }

    RevertReason::Raw(Bytes::copy_from_slice(data))
}

/// Extract the revert payload from a JSON-RPC error, if the error is a revert.
///
/// Nodes report reverts with code 3 or an "execution reverted" style message;
/// the payload travels in `data` either as a hex string or nested in an object.
pub(crate) fn revert_payload(err: &SdkError) -> Option<Bytes> {
    let SdkError::Rpc { code, message, data } = err else {
        return None;
    };
    if *code != 3 && !message.to_ascii_lowercase().contains("revert") {
        return None;
    }
    Some(data.as_deref().and_then(payload_from_data).unwrap_or_default())
}

/// Turn a node error into [`SdkError::ContractReverted`] when it reports a revert
pub(crate) fn revert_error(
    descriptors: &DescriptorSet,
    err: SdkError,
    transaction_hash: Option<H256>,
) -> SdkError {
    match revert_payload(&err) {
        Some(payload) => SdkError::ContractReverted {
            transaction_hash,
            reason: decode_revert(descriptors, &payload),
        },
        None => err,
    }
}

fn payload_from_data(data: &str) -> Option<Bytes> {
    if let Ok(bytes) = evmbind_primitives::decode_hex(data) {
        return Some(Bytes::from(bytes));
    }
    let value: Value = serde_json::from_str(data).ok()?;
    find_payload(&value)
}

fn find_payload(value: &Value) -> Option<Bytes> {
    match value {
        Value::String(s) if s.starts_with("0x") => evmbind_primitives::decode_hex(s).ok().map(Bytes::from),
        Value::Object(map) => {
            for key in ["data", "return"] {
                if let Some(found) = map.get(key).and_then(find_payload) {
                    return Some(found);
                }
            }
            map.values()
                .filter(|v| v.is_object())
                .find_map(find_payload)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{CustomErrorDescriptor, Param};
    use evmbind_abi::encode;

    fn transfer_event() -> EventDescriptor {
        EventDescriptor::new(
            "Transfer",
            vec![
                Param::indexed("from", AbiType::Address),
                Param::indexed("to", AbiType::Address),
                Param::new("value", AbiType::Uint(256)),
            ],
        )
    }

    fn insufficient_balance() -> CustomErrorDescriptor {
        CustomErrorDescriptor::new(
            "ERC20InsufficientBalance",
            vec![
                Param::new("sender", AbiType::Address),
                Param::new("balance", AbiType::Uint(256)),
                Param::new("needed", AbiType::Uint(256)),
            ],
        )
    }

    #[test]
    fn test_decode_output_shapes() {
        let single = FunctionDescriptor::constant("totalSupply", vec![], vec![AbiType::Uint(256)]);
        let data = encode(&[AbiType::Uint(256)], &[AbiValue::from(7u64)]).unwrap();
        assert_eq!(decode_output(&single, &data).unwrap(), AbiValue::from(7u64));

        let pair = FunctionDescriptor::constant("pair", vec![], vec![AbiType::Bool, AbiType::String]);
        let data = encode(
            &[AbiType::Bool, AbiType::String],
            &[AbiValue::Bool(true), AbiValue::from("ok")],
        )
        .unwrap();
        assert_eq!(
            decode_output(&pair, &data).unwrap(),
            AbiValue::Tuple(vec![AbiValue::Bool(true), AbiValue::from("ok")])
        );

        let none = FunctionDescriptor::new("burn", vec![], vec![]);
        assert_eq!(decode_output(&none, &[]).unwrap(), AbiValue::Tuple(vec![]));
    }

    #[test]
    fn test_empty_return_is_not_zero() {
        let single = FunctionDescriptor::constant("totalSupply", vec![], vec![AbiType::Uint(256)]);
        assert!(matches!(
            decode_output(&single, &[]),
            Err(SdkError::MalformedAbiData(_))
        ));
    }

    #[test]
    fn test_decode_transfer_log() {
        let from = Address::from_bytes([0x11; 20]);
        let to = Address::from_bytes([0x22; 20]);
        let event = transfer_event();
        let log = LogRecord::new(
            Address::from_bytes([0xaa; 20]),
            vec![event.topic(), H256::from_address(&from), H256::from_address(&to)],
            Bytes::from(encode(&[AbiType::Uint(256)], &[AbiValue::from(500u64)]).unwrap()),
        );

        let decoded = decode_event(&event, &log).unwrap();
        assert_eq!(decoded.name, "Transfer");
        assert_eq!(decoded.get("from"), Some(&AbiValue::Address(from)));
        assert_eq!(decoded.get("to"), Some(&AbiValue::Address(to)));
        assert_eq!(decoded.get("value"), Some(&AbiValue::from(500u64)));
        assert!(decoded.params[0].indexed && !decoded.params[2].indexed);
    }

    #[test]
    fn test_mismatched_topic_rejected() {
        let event = transfer_event();
        let log = LogRecord::new(
            Address::ZERO,
            vec![H256::from_bytes([1; 32]), H256::ZERO, H256::ZERO],
            Bytes::new(),
        );
        assert!(matches!(decode_event(&event, &log), Err(SdkError::EventMismatch(_))));

        let no_topics = LogRecord::new(Address::ZERO, vec![], Bytes::new());
        assert!(matches!(decode_event(&event, &no_topics), Err(SdkError::EventMismatch(_))));
    }

    #[test]
    fn test_wrong_topic_count_is_malformed() {
        let event = transfer_event();
        let log = LogRecord::new(Address::ZERO, vec![event.topic()], Bytes::new());
        assert!(matches!(decode_event(&event, &log), Err(SdkError::MalformedAbiData(_))));
    }

    #[test]
    fn test_indexed_string_is_hashed() {
        let event = EventDescriptor::new(
            "Named",
            vec![Param::indexed("label", AbiType::String), Param::new("n", AbiType::Uint(8))],
        );
        let label_hash = evmbind_crypto::keccak256(b"alice");
        let log = LogRecord::new(
            Address::ZERO,
            vec![event.topic(), label_hash],
            Bytes::from(encode(&[AbiType::Uint(8)], &[AbiValue::from(3u64)]).unwrap()),
        );
        let decoded = decode_event(&event, &log).unwrap();
        assert!(decoded.params[0].hashed);
        assert_eq!(decoded.params[0].value, AbiValue::bytes32(label_hash));
    }

    #[test]
    fn test_decode_custom_error() {
        let set = DescriptorSet::builder().error(insufficient_balance()).build();
        let sender = Address::from_bytes([0x33; 20]);

        let mut payload = insufficient_balance().selector().to_vec();
        payload.extend(
            encode(
                &[AbiType::Address, AbiType::Uint(256), AbiType::Uint(256)],
                &[AbiValue::Address(sender), AbiValue::from(100u64), AbiValue::from(500u64)],
            )
            .unwrap(),
        );

        let reason = decode_revert(&set, &payload);
        assert_eq!(reason.error_name(), Some("ERC20InsufficientBalance"));
        assert_eq!(reason.param("sender"), Some(&AbiValue::Address(sender)));
        assert_eq!(reason.param("balance"), Some(&AbiValue::from(100u64)));
        assert_eq!(reason.param("needed"), Some(&AbiValue::from(500u64)));
    }

    #[test]
    fn test_unknown_selector_stays_raw() {
        let set = DescriptorSet::builder().error(insufficient_balance()).build();
        let payload = vec![0xde, 0xad, 0xbe, 0xef, 0x01];
        assert_eq!(decode_revert(&set, &payload), RevertReason::Raw(Bytes::from(payload)));
        assert_eq!(decode_revert(&set, &[]), RevertReason::Raw(Bytes::new()));
    }

    #[test]
    fn test_truncated_custom_error_stays_raw() {
        let set = DescriptorSet::builder().error(insufficient_balance()).build();
        let mut payload = insufficient_balance().selector().to_vec();
        payload.extend([0u8; 40]);
        assert_eq!(
            decode_revert(&set, &payload),
            RevertReason::Raw(Bytes::from(payload.clone()))
        );
    }

    #[test]
    fn test_builtin_reverts() {
        let set = DescriptorSet::default();

        let mut message = ERROR_STRING_SELECTOR.to_vec();
        message.extend(encode(&[AbiType::String], &[AbiValue::from("not owner")]).unwrap());
        assert_eq!(decode_revert(&set, &message), RevertReason::Message("not owner".into()));

        let panic = hex::decode("4e487b710000000000000000000000000000000000000000000000000000000000000011")
            .unwrap();
        match decode_revert(&set, &panic) {
            RevertReason::Panic { code, meaning } => {
                assert_eq!(code, U256::from(0x11u64));
                assert!(meaning.contains("overflow"));
            }
            other => panic!("expected panic, got {:?}", other),
        }
    }

    #[test]
    fn test_revert_payload_from_rpc_error() {
        let err = SdkError::Rpc {
            code: 3,
            message: "execution reverted".into(),
            data: Some("0x08c379a0".into()),
        };
        assert_eq!(revert_payload(&err).unwrap().as_ref(), &ERROR_STRING_SELECTOR);

        let nested = SdkError::Rpc {
            code: -32000,
            message: "VM Exception while processing transaction: revert".into(),
            data: Some(r#"{"0xabc":{"error":"revert","return":"0xdeadbeef"}}"#.into()),
        };
        assert_eq!(revert_payload(&nested).unwrap().as_ref(), &[0xde, 0xad, 0xbe, 0xef]);

        let bare = SdkError::Rpc { code: 3, message: "execution reverted".into(), data: None };
        assert!(revert_payload(&bare).unwrap().is_empty());

        let other = SdkError::Rpc { code: -32601, message: "method not found".into(), data: None };
        assert!(revert_payload(&other).is_none());
        assert!(revert_payload(&SdkError::Transport("down".into())).is_none());
    }

    #[test]
    fn test_revert_display() {
        let reason = RevertReason::Custom {
            name: "ERC20InvalidReceiver".into(),
            params: vec![("receiver".into(), AbiValue::Address(Address::ZERO))],
        };
        assert_eq!(
            reason.to_string(),
            "ERC20InvalidReceiver(receiver: 0x0000000000000000000000000000000000000000)"
        );
        assert_eq!(RevertReason::Raw(Bytes::new()).to_string(), "no revert data");
    }
}
