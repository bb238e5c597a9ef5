//! ABI encoding

use evmbind_primitives::U256;

use crate::{AbiError, AbiType, AbiValue};

/// Encode values as the body of a tuple of `types`.
///
/// Every value is checked against its type before any byte is produced; a
/// mismatch in arity, kind or width is [`AbiError::ArgumentMismatch`].
pub fn encode(types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>, AbiError> {
    if types.len() != values.len() {
        return Err(AbiError::ArgumentMismatch(format!(
            "expected {} values, got {}",
            types.len(),
            values.len()
        )));
    }
    for (i, (ty, value)) in types.iter().zip(values).enumerate() {
        if !value.conforms_to(ty) {
            return Err(AbiError::ArgumentMismatch(format!(
                "argument {} does not conform to {}",
                i, ty
            )));
        }
    }

    let pairs: Vec<(&AbiType, &AbiValue)> = types.iter().zip(values).collect();
    encode_sequence(&pairs)
}

/// Head/tail encode a sequence. Offsets are relative to the start of the sequence.
fn encode_sequence(items: &[(&AbiType, &AbiValue)]) -> Result<Vec<u8>, AbiError> {
    let head_size: usize = items.iter().map(|(ty, _)| ty.head_size()).sum();

    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for (ty, value) in items {
        if ty.is_dynamic() {
            head.extend(u256_word(&U256::from(head_size + tail.len())));
            tail.extend(encode_value(ty, value)?);
        } else {
            head.extend(encode_value(ty, value)?);
        }
    }

    head.extend(tail);
    Ok(head)
}

fn encode_value(ty: &AbiType, value: &AbiValue) -> Result<Vec<u8>, AbiError> {
    let encoded = match (ty, value) {
        (AbiType::Uint(_), AbiValue::Uint(v)) => u256_word(v).to_vec(),
        (AbiType::Int(_), AbiValue::Int(v)) => v.to_word().to_vec(),
        (AbiType::Address, AbiValue::Address(addr)) => addr.to_word().to_vec(),
        (AbiType::Bool, AbiValue::Bool(b)) => {
            let mut word = [0u8; 32];
            word[31] = u8::from(*b);
            word.to_vec()
        }
        (AbiType::FixedBytes(_), AbiValue::FixedBytes(data)) => {
            let mut word = [0u8; 32];
            word[..data.len()].copy_from_slice(data);
            word.to_vec()
        }
        (AbiType::Bytes, AbiValue::Bytes(data)) => encode_bytes(data),
        (AbiType::String, AbiValue::String(s)) => encode_bytes(s.as_bytes()),
        (AbiType::Array(inner), AbiValue::Array(items)) => {
            let mut out = u256_word(&U256::from(items.len())).to_vec();
            let pairs: Vec<_> = items.iter().map(|v| (inner.as_ref(), v)).collect();
            out.extend(encode_sequence(&pairs)?);
            out
        }
        (AbiType::FixedArray(inner, _), AbiValue::FixedArray(items)) => {
            let pairs: Vec<_> = items.iter().map(|v| (inner.as_ref(), v)).collect();
            encode_sequence(&pairs)?
        }
        (AbiType::Tuple(types), AbiValue::Tuple(items)) => {
            let pairs: Vec<_> = types.iter().zip(items).collect();
            encode_sequence(&pairs)?
        }
        _ => {
            return Err(AbiError::ArgumentMismatch(format!(
                "value does not conform to {}",
                ty
            )))
        }
    };
    Ok(encoded)
}

fn u256_word(value: &U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

/// Length word followed by the data right-padded to a word boundary
fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let padded_len = data.len().div_ceil(32) * 32;
    let mut out = Vec::with_capacity(32 + padded_len);
    out.extend(u256_word(&U256::from(data.len())));
    out.extend_from_slice(data);
    out.resize(32 + padded_len, 0);
    out
}
