//! ABI type definitions

use std::fmt;

use evmbind_primitives::{Address, H256, U256};

use crate::AbiError;

/// Solidity parameter types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiType {
    /// Unsigned integer with bit size (8, 16, ..., 256)
    Uint(usize),
    /// Signed integer with bit size
    Int(usize),
    /// Address
    Address,
    /// Boolean
    Bool,
    /// Fixed-size bytes (size 1-32)
    FixedBytes(usize),
    /// Dynamic bytes
    Bytes,
    /// UTF-8 string
    String,
    /// Dynamic array
    Array(Box<AbiType>),
    /// Fixed-size array
    FixedArray(Box<AbiType>, usize),
    /// Tuple
    Tuple(Vec<AbiType>),
}

impl AbiType {
    /// Check if this type is dynamic (encoded through an offset into the tail)
    pub fn is_dynamic(&self) -> bool {
        match self {
            AbiType::Bytes | AbiType::String | AbiType::Array(_) => true,
            AbiType::FixedArray(inner, _) => inner.is_dynamic(),
            AbiType::Tuple(types) => types.iter().any(|t| t.is_dynamic()),
            _ => false,
        }
    }

    /// Number of bytes this type occupies in the head of its enclosing tuple
    pub fn head_size(&self) -> usize {
        match self {
            AbiType::FixedArray(inner, size) if !inner.is_dynamic() => {
                inner.head_size().saturating_mul(*size)
            }
            AbiType::Tuple(types) if !self.is_dynamic() => types.iter().map(|t| t.head_size()).sum(),
            _ => 32,
        }
    }

    /// Canonical name used in signatures (`uint256`, `bytes32[]`, `(address,bool)`)
    pub fn canonical(&self) -> String {
        match self {
            AbiType::Uint(bits) => format!("uint{}", bits),
            AbiType::Int(bits) => format!("int{}", bits),
            AbiType::Address => "address".to_string(),
            AbiType::Bool => "bool".to_string(),
            AbiType::FixedBytes(size) => format!("bytes{}", size),
            AbiType::Bytes => "bytes".to_string(),
            AbiType::String => "string".to_string(),
            AbiType::Array(inner) => format!("{}[]", inner.canonical()),
            AbiType::FixedArray(inner, size) => format!("{}[{}]", inner.canonical(), size),
            AbiType::Tuple(types) => {
                let inner: Vec<String> = types.iter().map(|t| t.canonical()).collect();
                format!("({})", inner.join(","))
            }
        }
    }

    /// Parse a type string such as `uint`, `bytes32[3]` or `(address,uint256)[]`
    pub fn parse(s: &str) -> Result<Self, AbiError> {
        let s = s.trim();

        if let Some(stripped) = s.strip_suffix(']') {
            let open = stripped
                .rfind('[')
                .ok_or_else(|| AbiError::InvalidType(s.to_string()))?;
            let inner = Box::new(Self::parse(&stripped[..open])?);
            let dim = &stripped[open + 1..];
            if dim.is_empty() {
                return Ok(AbiType::Array(inner));
            }
            let size = parse_decimal(dim)
                .ok_or_else(|| AbiError::InvalidType(format!("invalid array size: {}", dim)))?;
            return Ok(AbiType::FixedArray(inner, size));
        }

        if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            let members = split_top_level(inner)?
                .into_iter()
                .map(Self::parse)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(AbiType::Tuple(members));
        }

        match s {
            "address" => return Ok(AbiType::Address),
            "bool" => return Ok(AbiType::Bool),
            "string" => return Ok(AbiType::String),
            "bytes" => return Ok(AbiType::Bytes),
            "uint" => return Ok(AbiType::Uint(256)),
            "int" => return Ok(AbiType::Int(256)),
            _ => {}
        }

        if let Some(rest) = s.strip_prefix("uint") {
            return Ok(AbiType::Uint(parse_int_width(rest)?));
        }
        if let Some(rest) = s.strip_prefix("int") {
            return Ok(AbiType::Int(parse_int_width(rest)?));
        }
        if let Some(rest) = s.strip_prefix("bytes") {
            let size = parse_decimal(rest)
                .ok_or_else(|| AbiError::InvalidType(format!("invalid bytes size: {}", rest)))?;
            if !(1..=32).contains(&size) {
                return Err(AbiError::InvalidType(format!("bytes{} out of range", size)));
            }
            return Ok(AbiType::FixedBytes(size));
        }

        Err(AbiError::InvalidType(format!("unknown type: {}", s)))
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn parse_int_width(rest: &str) -> Result<usize, AbiError> {
    let bits = parse_decimal(rest)
        .ok_or_else(|| AbiError::InvalidType(format!("invalid integer size: {}", rest)))?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(AbiError::InvalidType(format!("integer size {} out of range", bits)));
    }
    Ok(bits)
}

/// Plain ASCII digits only; `usize::from_str` would also take a leading `+`
fn parse_decimal(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Split a comma separated list, ignoring commas nested in parentheses
pub(crate) fn split_top_level(s: &str) -> Result<Vec<&str>, AbiError> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(AbiError::InvalidType(format!("unbalanced parentheses: {}", s)));
                }
            }
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(AbiError::InvalidType(format!("unbalanced parentheses: {}", s)));
    }
    parts.push(&s[start..]);
    Ok(parts)
}

/// Solidity ABI values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    /// Unsigned integer (8-256 bits)
    Uint(U256),
    /// Signed integer (8-256 bits)
    Int(I256),
    /// Address (20 bytes)
    Address(Address),
    /// Boolean
    Bool(bool),
    /// Fixed-size bytes (1-32)
    FixedBytes(Vec<u8>),
    /// Dynamic bytes
    Bytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Dynamic array
    Array(Vec<AbiValue>),
    /// Fixed-size array
    FixedArray(Vec<AbiValue>),
    /// Tuple (struct, or several outputs)
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    /// Check that this value can be encoded as `ty`
    pub fn conforms_to(&self, ty: &AbiType) -> bool {
        match (self, ty) {
            (AbiValue::Uint(v), AbiType::Uint(bits)) => *bits <= 256 && v.bits() <= *bits,
            (AbiValue::Int(v), AbiType::Int(bits)) => v.fits(*bits),
            (AbiValue::Address(_), AbiType::Address)
            | (AbiValue::Bool(_), AbiType::Bool)
            | (AbiValue::Bytes(_), AbiType::Bytes)
            | (AbiValue::String(_), AbiType::String) => true,
            (AbiValue::FixedBytes(b), AbiType::FixedBytes(size)) => *size <= 32 && b.len() == *size,
            (AbiValue::Array(items), AbiType::Array(inner)) => {
                items.iter().all(|v| v.conforms_to(inner))
            }
            (AbiValue::FixedArray(items), AbiType::FixedArray(inner, size)) => {
                items.len() == *size && items.iter().all(|v| v.conforms_to(inner))
            }
            (AbiValue::Tuple(items), AbiType::Tuple(types)) => {
                items.len() == types.len()
                    && items.iter().zip(types).all(|(v, t)| v.conforms_to(t))
            }
            _ => false,
        }
    }

    /// A `bytes32` value
    pub fn bytes32(hash: H256) -> Self {
        AbiValue::FixedBytes(hash.as_bytes().to_vec())
    }

    /// Unsigned integer payload
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            AbiValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Signed integer payload
    pub fn as_int(&self) -> Option<I256> {
        match self {
            AbiValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Address payload
    pub fn as_address(&self) -> Option<Address> {
        match self {
            AbiValue::Address(a) => Some(*a),
            _ => None,
        }
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AbiValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AbiValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes of a `bytes` or `bytesN` value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AbiValue::Bytes(b) | AbiValue::FixedBytes(b) => Some(b),
            _ => None,
        }
    }

    /// Members of an array, fixed array or tuple
    pub fn as_slice(&self) -> Option<&[AbiValue]> {
        match self {
            AbiValue::Array(items) | AbiValue::FixedArray(items) | AbiValue::Tuple(items) => {
                Some(items)
            }
            _ => None,
        }
    }
}

impl fmt::Display for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiValue::Uint(v) => write!(f, "{}", v),
            AbiValue::Int(v) => write!(f, "{}", v),
            AbiValue::Address(a) => write!(f, "{}", a),
            AbiValue::Bool(b) => write!(f, "{}", b),
            AbiValue::FixedBytes(b) | AbiValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            AbiValue::String(s) => write!(f, "{:?}", s),
            AbiValue::Array(items) | AbiValue::FixedArray(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            AbiValue::Tuple(items) => {
                write!(f, "(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[AbiValue]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl From<U256> for AbiValue {
    fn from(v: U256) -> Self {
        AbiValue::Uint(v)
    }
}

impl From<u64> for AbiValue {
    fn from(v: u64) -> Self {
        AbiValue::Uint(U256::from(v))
    }
}

impl From<I256> for AbiValue {
    fn from(v: I256) -> Self {
        AbiValue::Int(v)
    }
}

impl From<Address> for AbiValue {
    fn from(a: Address) -> Self {
        AbiValue::Address(a)
    }
}

impl From<bool> for AbiValue {
    fn from(b: bool) -> Self {
        AbiValue::Bool(b)
    }
}

impl From<&str> for AbiValue {
    fn from(s: &str) -> Self {
        AbiValue::String(s.to_string())
    }
}

impl From<String> for AbiValue {
    fn from(s: String) -> Self {
        AbiValue::String(s)
    }
}

/// Signed 256-bit integer in sign-magnitude form.
///
/// Zero is never negative; [`I256::new`] normalises `-0` to `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct I256 {
    /// Absolute value
    pub abs: U256,
    /// Sign (true if negative)
    pub negative: bool,
}

impl I256 {
    /// Create a new I256
    pub fn new(abs: U256, negative: bool) -> Self {
        Self {
            abs,
            negative: negative && !abs.is_zero(),
        }
    }

    /// Create from i128
    pub fn from_i128(value: i128) -> Self {
        Self::new(U256::from(value.unsigned_abs()), value < 0)
    }

    /// Convert to i128 when in range
    pub fn to_i128(&self) -> Option<i128> {
        if self.abs.bits() > 128 {
            return None;
        }
        let abs = self.abs.as_u128();
        if self.negative {
            if abs == i128::MIN.unsigned_abs() {
                Some(i128::MIN)
            } else {
                i128::try_from(abs).ok().map(|v| -v)
            }
        } else {
            i128::try_from(abs).ok()
        }
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.abs.is_zero()
    }

    /// Whether the value is representable as a signed integer of `bits` bits
    pub fn fits(&self, bits: usize) -> bool {
        if bits == 0 || bits > 256 {
            return false;
        }
        let limit = U256::one() << (bits - 1);
        if self.negative {
            self.abs <= limit
        } else {
            self.abs < limit
        }
    }

    /// 32-byte two's complement word
    pub fn to_word(&self) -> [u8; 32] {
        let raw = if self.negative {
            (!self.abs).overflowing_add(U256::one()).0
        } else {
            self.abs
        };
        let mut word = [0u8; 32];
        raw.to_big_endian(&mut word);
        word
    }

    /// Read a 32-byte two's complement word
    pub fn from_word(word: &[u8; 32]) -> Self {
        let raw = U256::from_big_endian(word);
        if word[0] & 0x80 != 0 {
            Self::new((!raw).overflowing_add(U256::one()).0, true)
        } else {
            Self::new(raw, false)
        }
    }
}

impl fmt::Display for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.abs)
        } else {
            write!(f, "{}", self.abs)
        }
    }
}
