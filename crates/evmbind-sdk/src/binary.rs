//! Deployment bytecode and library linking

use bytes::Bytes;
use evmbind_crypto::keccak256;
use evmbind_primitives::Address;

use crate::SdkError;

/// Length of a link placeholder: the hex width of an address
const PLACEHOLDER_LEN: usize = 40;

/// Compiled deployment bytecode, possibly with unresolved library placeholders.
///
/// Immutable. Linking produces a new value, see [`link_binary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractBinary {
    code: String,
    placeholders: Vec<String>,
}

impl ContractBinary {
    /// Parse compiler output: hex with an optional `0x`, where each library
    /// reference is a 40-character placeholder, either `__$<34 hex>$__` or
    /// the legacy `__Name___…` form.
    pub fn parse(hex_code: &str) -> Result<Self, SdkError> {
        let trimmed = hex_code.trim();
        let code = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let mut placeholders: Vec<String> = Vec::new();
        let bytes = code.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if code[i..].starts_with("__") {
                let end = i + PLACEHOLDER_LEN;
                let placeholder = code
                    .get(i..end)
                    .filter(|p| p.ends_with("__") && p.is_ascii())
                    .ok_or_else(|| {
                        SdkError::InvalidHex(format!("truncated link placeholder at offset {}", i))
                    })?;
                if !placeholders.iter().any(|p| p == placeholder) {
                    placeholders.push(placeholder.to_string());
                }
                i = end;
                continue;
            }
            match bytes.get(i + 1) {
                Some(next) if bytes[i].is_ascii_hexdigit() && next.is_ascii_hexdigit() => i += 2,
                _ => {
                    return Err(SdkError::InvalidHex(format!(
                        "invalid bytecode character at offset {}",
                        i
                    )))
                }
            }
        }

        Ok(Self {
            code: code.to_string(),
            placeholders,
        })
    }

    /// Already-linked bytecode
    pub fn from_bytes(code: &[u8]) -> Self {
        Self {
            code: hex::encode(code),
            placeholders: Vec::new(),
        }
    }

    /// Distinct unresolved placeholders, in order of first appearance
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// No placeholders left
    pub fn is_linked(&self) -> bool {
        self.placeholders.is_empty()
    }

    /// Deployable bytes.
    ///
    /// Fails with [`SdkError::ArgumentMismatch`] while placeholders remain.
    pub fn bytecode(&self) -> Result<Bytes, SdkError> {
        if !self.is_linked() {
            return Err(SdkError::ArgumentMismatch(format!(
                "binary has unresolved library references: {}",
                self.placeholders.join(", ")
            )));
        }
        Ok(Bytes::from(hex::decode(&self.code)?))
    }
}

/// A library address for one placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReference {
    placeholder: String,
    address: Address,
}

impl LinkReference {
    /// Placeholder `__$<first 34 hex of keccak256(name)>$__` for the fully
    /// qualified library name, e.g. `contracts/Math.sol:Math`
    pub fn new(fully_qualified_name: &str, address: Address) -> Self {
        let hash = hex::encode(keccak256(fully_qualified_name.as_bytes()).as_bytes());
        Self {
            placeholder: format!("__${}$__", &hash[..34]),
            address,
        }
    }

    /// Legacy placeholder: `__` + name (at most 36 characters) padded with `_`
    pub fn legacy(name: &str, address: Address) -> Self {
        let name: String = name.chars().take(PLACEHOLDER_LEN - 4).collect();
        Self {
            placeholder: format!("__{:_<width$}", name, width = PLACEHOLDER_LEN - 2),
            address,
        }
    }

    /// The placeholder text this reference resolves
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Library address
    pub fn address(&self) -> Address {
        self.address
    }
}

/// Replace every occurrence of each referenced placeholder with its library
/// address. Returns a new binary; references to placeholders that do not
/// occur are ignored, so linking twice is the same as linking once.
pub fn link_binary(binary: &ContractBinary, references: &[LinkReference]) -> ContractBinary {
    let mut code = binary.code.clone();
    for reference in references {
        if binary.placeholders.iter().any(|p| *p == reference.placeholder) {
            code = code.replace(&reference.placeholder, &hex::encode(reference.address.as_bytes()));
        }
    }
    let placeholders = binary
        .placeholders
        .iter()
        .filter(|p| !references.iter().any(|r| r.placeholder == **p))
        .cloned()
        .collect();
    ContractBinary { code, placeholders }
}
