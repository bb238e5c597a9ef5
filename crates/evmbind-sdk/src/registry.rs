//! Descriptor set: the read-only lookup table behind a contract handle

use std::collections::HashMap;

use evmbind_abi::AbiType;
use evmbind_primitives::H256;
use serde::Deserialize;

use crate::descriptor::{CustomErrorDescriptor, EventDescriptor, FunctionDescriptor, Param};
use crate::SdkError;

/// Immutable set of function, event and custom-error descriptors.
///
/// Selectors and topics are computed once in [`DescriptorSetBuilder::build`];
/// there is no way to add descriptors afterwards.
#[derive(Debug, Clone, Default)]
pub struct DescriptorSet {
    functions: Vec<FunctionDescriptor>,
    events: Vec<EventDescriptor>,
    errors: Vec<CustomErrorDescriptor>,
    constructor: Option<Vec<Param>>,
    functions_by_name: HashMap<String, usize>,
    functions_by_selector: HashMap<[u8; 4], usize>,
    events_by_name: HashMap<String, usize>,
    events_by_topic: HashMap<H256, usize>,
    errors_by_selector: HashMap<[u8; 4], usize>,
}

impl DescriptorSet {
    /// Start a new set
    pub fn builder() -> DescriptorSetBuilder {
        DescriptorSetBuilder::default()
    }

    /// Function by name. For overloaded names the first declaration wins;
    /// use [`DescriptorSet::function_by_selector`] to reach the others.
    pub fn function(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions_by_name.get(name).map(|&i| &self.functions[i])
    }

    /// Function by 4-byte selector
    pub fn function_by_selector(&self, selector: &[u8; 4]) -> Option<&FunctionDescriptor> {
        self.functions_by_selector
            .get(selector)
            .map(|&i| &self.functions[i])
    }

    /// Event by name
    pub fn event(&self, name: &str) -> Option<&EventDescriptor> {
        self.events_by_name.get(name).map(|&i| &self.events[i])
    }

    /// Event by topic0
    pub fn event_by_topic(&self, topic: &H256) -> Option<&EventDescriptor> {
        self.events_by_topic.get(topic).map(|&i| &self.events[i])
    }

    /// Custom error by 4-byte selector
    pub fn error_by_selector(&self, selector: &[u8; 4]) -> Option<&CustomErrorDescriptor> {
        self.errors_by_selector.get(selector).map(|&i| &self.errors[i])
    }

    /// Constructor inputs, empty when no constructor was declared
    pub fn constructor_inputs(&self) -> &[Param] {
        self.constructor.as_deref().unwrap_or(&[])
    }

    /// All functions in declaration order
    pub fn functions(&self) -> &[FunctionDescriptor] {
        &self.functions
    }

    /// All events in declaration order
    pub fn events(&self) -> &[EventDescriptor] {
        &self.events
    }

    /// All custom errors in declaration order
    pub fn errors(&self) -> &[CustomErrorDescriptor] {
        &self.errors
    }

    /// Build a set from a compiler ABI array.
    ///
    /// Understands `function`, `event`, `error` and `constructor` entries; other
    /// entry kinds (`fallback`, `receive`) carry nothing callable by name and are
    /// skipped. Tuple types are resolved from their `components`.
    ///
    /// # Errors
    ///
    /// - [`SdkError::Serialization`] when `json` is not an ABI array
    /// - [`SdkError::InvalidAbi`] for an unparsable type, or an event with more
    ///   indexed inputs than a log has topics for
    pub fn from_json_abi(json: &str) -> Result<Self, SdkError> {
        let entries: Vec<JsonEntry> = serde_json::from_str(json)?;
        let mut builder = Self::builder();

        for entry in entries {
            match entry.kind.as_str() {
                "function" => {
                    let inputs = resolve_params(&entry.inputs)?;
                    let outputs = entry
                        .outputs
                        .iter()
                        .map(resolve_type)
                        .collect::<Result<Vec<_>, _>>()?;
                    let constant = match entry.state_mutability.as_deref() {
                        Some(m) => m == "view" || m == "pure",
                        None => entry.constant.unwrap_or(false),
                    };
                    let payable = match entry.state_mutability.as_deref() {
                        Some(m) => m == "payable",
                        None => entry.payable.unwrap_or(false),
                    };
                    builder = builder.function(FunctionDescriptor {
                        name: entry.name,
                        inputs,
                        outputs,
                        constant,
                        payable,
                    });
                }
                "event" => {
                    let params = resolve_params(&entry.inputs)?;
                    let indexed = params.iter().filter(|p| p.indexed).count();
                    let limit = if entry.anonymous { MAX_TOPICS } else { MAX_TOPICS - 1 };
                    if indexed > limit {
                        return Err(SdkError::InvalidAbi(format!(
                            "event {} has {} indexed inputs, at most {} allowed",
                            entry.name, indexed, limit
                        )));
                    }
                    builder = builder.event(EventDescriptor {
                        name: entry.name,
                        params,
                        anonymous: entry.anonymous,
                    });
                }
                "error" => {
                    let inputs = resolve_params(&entry.inputs)?;
                    builder = builder.error(CustomErrorDescriptor::new(entry.name, inputs));
                }
                "constructor" => {
                    builder = builder.constructor(resolve_params(&entry.inputs)?);
                }
                _ => {}
            }
        }

        Ok(builder.build())
    }
}

/// Collects descriptors before freezing them into a [`DescriptorSet`]
#[derive(Debug, Default)]
pub struct DescriptorSetBuilder {
    functions: Vec<FunctionDescriptor>,
    events: Vec<EventDescriptor>,
    errors: Vec<CustomErrorDescriptor>,
    constructor: Option<Vec<Param>>,
}

impl DescriptorSetBuilder {
    /// Add a function
    pub fn function(mut self, function: FunctionDescriptor) -> Self {
        self.functions.push(function);
        self
    }

    /// Add an event
    pub fn event(mut self, event: EventDescriptor) -> Self {
        self.events.push(event);
        self
    }

    /// Add a custom error
    pub fn error(mut self, error: CustomErrorDescriptor) -> Self {
        self.errors.push(error);
        self
    }

    /// Declare the constructor inputs
    pub fn constructor(mut self, inputs: Vec<Param>) -> Self {
        self.constructor = Some(inputs);
        self
    }

    /// Freeze into an immutable set
    pub fn build(self) -> DescriptorSet {
        let mut functions_by_name = HashMap::new();
        let mut functions_by_selector = HashMap::new();
        for (i, f) in self.functions.iter().enumerate() {
            functions_by_name.entry(f.name.clone()).or_insert(i);
            functions_by_selector.entry(f.selector()).or_insert(i);
        }

        let mut events_by_name = HashMap::new();
        let mut events_by_topic = HashMap::new();
        for (i, e) in self.events.iter().enumerate() {
            events_by_name.entry(e.name.clone()).or_insert(i);
            if !e.anonymous {
                events_by_topic.entry(e.topic()).or_insert(i);
            }
        }

        let mut errors_by_selector = HashMap::new();
        for (i, e) in self.errors.iter().enumerate() {
            errors_by_selector.entry(e.selector()).or_insert(i);
        }

        DescriptorSet {
            functions: self.functions,
            events: self.events,
            errors: self.errors,
            constructor: self.constructor,
            functions_by_name,
            functions_by_selector,
            events_by_name,
            events_by_topic,
            errors_by_selector,
        }
    }
}

// ==================== JSON ABI ====================

/// Topics a log can carry, topic0 included
const MAX_TOPICS: usize = 4;

#[derive(Deserialize)]
struct JsonEntry {
    #[serde(rename = "type", default = "default_kind")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<JsonParam>,
    #[serde(default)]
    outputs: Vec<JsonParam>,
    #[serde(rename = "stateMutability")]
    state_mutability: Option<String>,
    constant: Option<bool>,
    payable: Option<bool>,
    #[serde(default)]
    anonymous: bool,
}

#[derive(Deserialize)]
struct JsonParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    components: Vec<JsonParam>,
    #[serde(default)]
    indexed: bool,
}

fn default_kind() -> String {
    "function".to_string()
}

fn resolve_params(params: &[JsonParam]) -> Result<Vec<Param>, SdkError> {
    params
        .iter()
        .map(|p| {
            Ok(Param {
                name: p.name.clone(),
                ty: resolve_type(p)?,
                indexed: p.indexed,
            })
        })
        .collect()
}

/// `tuple`, `tuple[]`, `tuple[2]` take their member list from `components`
fn resolve_type(param: &JsonParam) -> Result<AbiType, SdkError> {
    let type_string = match param.ty.strip_prefix("tuple") {
        Some(suffix) => {
            let members = param
                .components
                .iter()
                .map(|c| resolve_type(c).map(|t| t.canonical()))
                .collect::<Result<Vec<_>, _>>()?;
            format!("({}){}", members.join(","), suffix)
        }
        None => param.ty.clone(),
    };
    AbiType::parse(&type_string)
        .map_err(|e| SdkError::InvalidAbi(format!("{}: {}", param.name, e)))
}
