//! External protocol calls
//!
//! Calls leave the strategy as ABI-encoded bytes and come back the same way,
//! exactly as they would over an EVM call. The code deployed at the target
//! decides how the bytes are handled. Control is handed to foreign code for
//! the duration of the call, so callers must commit their own state first.

pub(crate) mod lending;
pub(crate) mod vault;

use alloy_primitives::Address;
use alloy_sol_types::SolCall;

use crate::{
    code::{code_at, Code},
    utils::{
        common::decode_abi_response,
        error::{protocol_failure, ManagerResult},
    },
};

/// Sends raw calldata from `caller` to `target` and returns the raw return data
pub fn call(caller: Address, target: Address, data: &[u8]) -> ManagerResult<Vec<u8>> {
    match code_at(target) {
        Some(Code::LendingMarket) => lending::dispatch(caller, target, data),
        Some(Code::ShareVault) => vault::dispatch(caller, target, data),
        _ => Err(protocol_failure(
            target,
            format!("no protocol code to handle call 0x{}", selector_hex(data)),
        )),
    }
}

/// Encodes `payload`, sends it to `target` and decodes the typed return value.
/// Undecodable return data counts as a failed call.
pub fn call_typed<F: SolCall>(
    caller: Address,
    target: Address,
    payload: &F,
) -> ManagerResult<F::Return> {
    let data = payload.abi_encode();
    let response = call(caller, target, &data)?;
    decode_abi_response::<F::Return, F>(&response).map_err(|err| {
        protocol_failure(
            target,
            format!("call 0x{} returned undecodable data: {:?}", selector_hex(&data), err),
        )
    })
}

/// Hex encoded function selector of `data`
pub(crate) fn selector_hex(data: &[u8]) -> String {
    hex::encode(&data[..data.len().min(4)])
}
