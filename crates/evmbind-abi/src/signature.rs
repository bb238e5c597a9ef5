//! Canonical signatures, selectors and topics

use evmbind_crypto::keccak256;
use evmbind_primitives::H256;

use crate::types::split_top_level;
use crate::{AbiError, AbiType};

/// Build `name(type1,type2,...)` from canonical type names
pub fn canonical_signature(name: &str, inputs: &[AbiType]) -> String {
    let types: Vec<String> = inputs.iter().map(|t| t.canonical()).collect();
    format!("{}({})", name, types.join(","))
}

/// Compute function selector (first 4 bytes of keccak256(signature))
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash.as_bytes()[..4]);
    selector
}

/// Compute an event topic (full keccak256 of the signature)
pub fn topic_hash(signature: &str) -> H256 {
    keccak256(signature.as_bytes())
}

/// Split `transfer(address,uint256)` into its name and parameter types.
///
/// Type names may use aliases (`uint`), the returned types are canonical.
pub fn parse_signature(signature: &str) -> Result<(String, Vec<AbiType>), AbiError> {
    let signature = signature.trim();
    let open = signature
        .find('(')
        .ok_or_else(|| AbiError::InvalidType(format!("missing '(' in {}", signature)))?;
    let params = signature[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| AbiError::InvalidType(format!("missing ')' in {}", signature)))?;

    let name = signature[..open].trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return Err(AbiError::InvalidType(format!("invalid name in {}", signature)));
    }

    let types = split_top_level(params)?
        .into_iter()
        .map(AbiType::parse)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((name.to_string(), types))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_selector() {
        assert_eq!(function_selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(function_selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
    }

    #[test]
    fn test_transfer_topic() {
        assert_eq!(
            topic_hash("Transfer(address,address,uint256)").to_hex(),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_parse_signature() {
        let (name, types) = parse_signature("transfer(address,uint)").unwrap();
        assert_eq!(name, "transfer");
        assert_eq!(types, vec![AbiType::Address, AbiType::Uint(256)]);
        assert_eq!(canonical_signature(&name, &types), "transfer(address,uint256)");

        let (name, types) = parse_signature("totalSupply()").unwrap();
        assert_eq!(name, "totalSupply");
        assert!(types.is_empty());

        let (_, types) = parse_signature("f((uint256,bytes)[],bool)").unwrap();
        assert_eq!(types.len(), 2);
        assert_eq!(canonical_signature("f", &types), "f((uint256,bytes)[],bool)");
    }

    #[test]
    fn test_parse_signature_rejects_garbage() {
        assert!(parse_signature("transfer").is_err());
        assert!(parse_signature("transfer(address").is_err());
        assert!(parse_signature("(address)").is_err());
        assert!(parse_signature("transfer(adress)").is_err());
    }
}
