//! Function, event and custom-error descriptors

use evmbind_abi::{canonical_signature, function_selector, topic_hash, AbiType};
use evmbind_primitives::H256;

/// A named parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name, may be empty
    pub name: String,
    /// ABI type
    pub ty: AbiType,
    /// Stored in a topic rather than in log data (events only)
    pub indexed: bool,
}

impl Param {
    /// Non-indexed parameter
    pub fn new(name: impl Into<String>, ty: AbiType) -> Self {
        Self {
            name: name.into(),
            ty,
            indexed: false,
        }
    }

    /// Indexed event parameter
    pub fn indexed(name: impl Into<String>, ty: AbiType) -> Self {
        Self {
            name: name.into(),
            ty,
            indexed: true,
        }
    }
}

fn types_of(params: &[Param]) -> Vec<AbiType> {
    params.iter().map(|p| p.ty.clone()).collect()
}

/// Contract function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    /// Function name
    pub name: String,
    /// Inputs in declaration order
    pub inputs: Vec<Param>,
    /// Output types
    pub outputs: Vec<AbiType>,
    /// Read-only (`view`/`pure`): routed to `eth_call`
    pub constant: bool,
    /// Accepts value
    pub payable: bool,
}

impl FunctionDescriptor {
    /// State-mutating, non-payable function
    pub fn new(name: impl Into<String>, inputs: Vec<Param>, outputs: Vec<AbiType>) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs,
            constant: false,
            payable: false,
        }
    }

    /// Read-only function
    pub fn constant(name: impl Into<String>, inputs: Vec<Param>, outputs: Vec<AbiType>) -> Self {
        Self {
            constant: true,
            ..Self::new(name, inputs, outputs)
        }
    }

    /// Mark as payable
    pub fn payable(mut self) -> Self {
        self.payable = true;
        self
    }

    /// Input types in order
    pub fn input_types(&self) -> Vec<AbiType> {
        types_of(&self.inputs)
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub fn signature(&self) -> String {
        canonical_signature(&self.name, &self.input_types())
    }

    /// 4-byte selector
    pub fn selector(&self) -> [u8; 4] {
        function_selector(&self.signature())
    }
}

/// Contract event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDescriptor {
    /// Event name
    pub name: String,
    /// Parameters in declaration order
    pub params: Vec<Param>,
    /// Anonymous events carry no topic0
    pub anonymous: bool,
}

impl EventDescriptor {
    /// Non-anonymous event
    pub fn new(name: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            name: name.into(),
            params,
            anonymous: false,
        }
    }

    /// Canonical signature over every parameter, indexed or not
    pub fn signature(&self) -> String {
        canonical_signature(&self.name, &types_of(&self.params))
    }

    /// Topic0: keccak256 of the signature
    pub fn topic(&self) -> H256 {
        topic_hash(&self.signature())
    }

    /// Number of topics a matching log carries
    pub fn topic_count(&self) -> usize {
        let indexed = self.params.iter().filter(|p| p.indexed).count();
        if self.anonymous {
            indexed
        } else {
            indexed + 1
        }
    }
}

/// Custom error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomErrorDescriptor {
    /// Error name
    pub name: String,
    /// Inputs in declaration order
    pub inputs: Vec<Param>,
}

impl CustomErrorDescriptor {
    /// Create a custom error descriptor
    pub fn new(name: impl Into<String>, inputs: Vec<Param>) -> Self {
        Self {
            name: name.into(),
            inputs,
        }
    }

    /// Input types in order
    pub fn input_types(&self) -> Vec<AbiType> {
        types_of(&self.inputs)
    }

    /// Canonical signature
    pub fn signature(&self) -> String {
        canonical_signature(&self.name, &self.input_types())
    }

    /// 4-byte selector, computed like a function selector
    pub fn selector(&self) -> [u8; 4] {
        function_selector(&self.signature())
    }
}
