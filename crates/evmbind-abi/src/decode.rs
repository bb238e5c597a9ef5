//! ABI decoding
//!
//! Decoding is strict: every offset and length is bounds-checked against the
//! buffer, and words whose padding or range contradicts the declared type are
//! rejected rather than truncated.
//!
//! Dynamic-array elements across the whole decode are capped at the buffer
//! length, so offsets that alias the same region cannot multiply the work.

use evmbind_primitives::{Address, U256};

use crate::{AbiError, AbiType, AbiValue, I256};

/// Decode a tuple of `types` from ABI-encoded data
pub fn decode(types: &[AbiType], data: &[u8]) -> Result<Vec<AbiValue>, AbiError> {
    let mut budget = data.len();
    decode_sequence(types.iter(), data, 0, &mut budget)
}

/// Decode a head/tail sequence that starts at `base`
fn decode_sequence<'t>(
    types: impl Iterator<Item = &'t AbiType>,
    data: &[u8],
    base: usize,
    budget: &mut usize,
) -> Result<Vec<AbiValue>, AbiError> {
    let mut values = Vec::new();
    let mut head = base;

    for ty in types {
        if ty.is_dynamic() {
            let offset = read_offset(data, head)?;
            let start = base
                .checked_add(offset)
                .ok_or_else(|| malformed(format!("offset {} overflows", offset)))?;
            values.push(decode_at(ty, data, start, budget)?);
            head += 32;
        } else {
            values.push(decode_at(ty, data, head, budget)?);
            head += ty.head_size();
        }
    }

    Ok(values)
}

/// Decode a value whose encoding begins at `pos`
fn decode_at(ty: &AbiType, data: &[u8], pos: usize, budget: &mut usize) -> Result<AbiValue, AbiError> {
    match ty {
        AbiType::Uint(bits) => {
            let value = U256::from_big_endian(read_word(data, pos)?);
            if value.bits() > *bits {
                return Err(malformed(format!("value exceeds uint{}", bits)));
            }
            Ok(AbiValue::Uint(value))
        }
        AbiType::Int(bits) => {
            let value = I256::from_word(read_word(data, pos)?);
            if !value.fits(*bits) {
                return Err(malformed(format!("value exceeds int{}", bits)));
            }
            Ok(AbiValue::Int(value))
        }
        AbiType::Address => {
            let word = read_word(data, pos)?;
            Address::from_word(word)
                .map(AbiValue::Address)
                .ok_or_else(|| malformed("address word has non-zero padding"))
        }
        AbiType::Bool => {
            let word = read_word(data, pos)?;
            if word[..31].iter().any(|b| *b != 0) || word[31] > 1 {
                return Err(malformed("bool word is neither 0 nor 1"));
            }
            Ok(AbiValue::Bool(word[31] == 1))
        }
        AbiType::FixedBytes(size) => {
            let word = read_word(data, pos)?;
            if *size == 0 || *size > 32 || word[*size..].iter().any(|b| *b != 0) {
                return Err(malformed(format!("bytes{} word has non-zero padding", size)));
            }
            Ok(AbiValue::FixedBytes(word[..*size].to_vec()))
        }
        AbiType::Bytes => Ok(AbiValue::Bytes(read_bytes(data, pos)?.to_vec())),
        AbiType::String => {
            let bytes = read_bytes(data, pos)?;
            let s = std::str::from_utf8(bytes)
                .map_err(|e| malformed(format!("invalid UTF-8: {}", e)))?;
            Ok(AbiValue::String(s.to_string()))
        }
        AbiType::Array(inner) => {
            let len = read_offset(data, pos)?;
            if len > *budget {
                return Err(malformed(format!(
                    "array length {} exceeds the {} elements left to decode",
                    len, budget
                )));
            }
            *budget -= len;
            let items = decode_sequence(
                std::iter::repeat(inner.as_ref()).take(len),
                data,
                pos + 32,
                budget,
            )?;
            Ok(AbiValue::Array(items))
        }
        AbiType::FixedArray(inner, size) => {
            let items = decode_sequence(std::iter::repeat(inner.as_ref()).take(*size), data, pos, budget)?;
            Ok(AbiValue::FixedArray(items))
        }
        AbiType::Tuple(types) => Ok(AbiValue::Tuple(decode_sequence(types.iter(), data, pos, budget)?)),
    }
}

fn read_word(data: &[u8], pos: usize) -> Result<&[u8; 32], AbiError> {
    pos.checked_add(32)
        .and_then(|end| data.get(pos..end))
        .and_then(|slice| <&[u8; 32]>::try_from(slice).ok())
        .ok_or_else(|| {
            malformed(format!(
                "need 32 bytes at offset {}, have {}",
                pos,
                data.len()
            ))
        })
}

/// Read a word used as an offset or length; it must be addressable within the buffer
fn read_offset(data: &[u8], pos: usize) -> Result<usize, AbiError> {
    let value = U256::from_big_endian(read_word(data, pos)?);
    if value > U256::from(data.len()) {
        return Err(malformed(format!("offset or length {} outside buffer", value)));
    }
    Ok(value.as_usize())
}

/// Length-prefixed byte string at `pos`
fn read_bytes(data: &[u8], pos: usize) -> Result<&[u8], AbiError> {
    let len = read_offset(data, pos)?;
    let start = pos + 32;
    start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| malformed(format!("length {} overruns buffer", len)))
}

fn malformed(msg: impl Into<String>) -> AbiError {
    AbiError::MalformedData(msg.into())
}
