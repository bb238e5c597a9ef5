//! Call builder: selector + encoded arguments

use bytes::Bytes;
use evmbind_abi::{encode, AbiValue};

use crate::descriptor::{FunctionDescriptor, Param};
use crate::SdkError;

/// Where a prepared call goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Read-only, answered by `eth_call`
    Call,
    /// State-mutating, submitted through the transaction manager
    Transaction,
}

/// Call data ready to send, with its route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCall {
    /// Function name
    pub function: String,
    /// Selector followed by the encoded arguments
    pub data: Bytes,
    /// Destination
    pub route: Route,
}

/// Validate `args` against `function` and build its call data.
///
/// Nothing is sent; an [`SdkError::ArgumentMismatch`] here means no network
/// request was made.
pub fn build_call_data(function: &FunctionDescriptor, args: &[AbiValue]) -> Result<Bytes, SdkError> {
    let encoded = encode_arguments(&function.name, &function.inputs, args)?;

    let mut data = Vec::with_capacity(4 + encoded.len());
    data.extend_from_slice(&function.selector());
    data.extend_from_slice(&encoded);
    Ok(Bytes::from(data))
}

/// Build call data and pick the route from the function's mutability
pub fn prepare(function: &FunctionDescriptor, args: &[AbiValue]) -> Result<PreparedCall, SdkError> {
    let data = build_call_data(function, args)?;
    let route = if function.constant {
        Route::Call
    } else {
        Route::Transaction
    };
    Ok(PreparedCall {
        function: function.name.clone(),
        data,
        route,
    })
}

/// Deployment data: bytecode followed by the encoded constructor arguments
pub fn build_deploy_data(
    bytecode: &[u8],
    constructor: &[Param],
    args: &[AbiValue],
) -> Result<Bytes, SdkError> {
    let encoded = encode_arguments("constructor", constructor, args)?;

    let mut data = Vec::with_capacity(bytecode.len() + encoded.len());
    data.extend_from_slice(bytecode);
    data.extend_from_slice(&encoded);
    Ok(Bytes::from(data))
}

fn encode_arguments(name: &str, inputs: &[Param], args: &[AbiValue]) -> Result<Vec<u8>, SdkError> {
    if args.len() != inputs.len() {
        return Err(SdkError::ArgumentMismatch(format!(
            "{} expects {} arguments, got {}",
            name,
            inputs.len(),
            args.len()
        )));
    }
    if let Some((param, arg)) = inputs
        .iter()
        .zip(args)
        .find(|(param, arg)| !arg.conforms_to(&param.ty))
    {
        return Err(SdkError::ArgumentMismatch(format!(
            "{}: argument {} is not a valid {}: {}",
            name,
            if param.name.is_empty() { "<unnamed>" } else { &param.name },
            param.ty,
            arg
        )));
    }

    let types: Vec<_> = inputs.iter().map(|p| p.ty.clone()).collect();
    Ok(encode(&types, args)?)
}
