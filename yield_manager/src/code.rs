//! Code deployed at addresses
//!
//! Every participant lives at an address. The code table records what kind of
//! code runs there, which is what the factory checks before deploying and what
//! a strategy instance dispatches to through its implementation pointer.

use alloy_primitives::Address;
use candid::CandidType;
use serde::Deserialize;

use crate::{
    state::{CODE, DEPLOY_NONCE},
    utils::error::{ManagerResult, Violation},
};

/// Where the integer-division remainder of a routed amount ends up
#[derive(Clone, Copy, CandidType, Debug, Default, Deserialize, PartialEq, Eq)]
pub enum RemainderPolicy {
    /// The remainder stays as idle balance in the instance
    #[default]
    Idle,
    /// The remainder is added to the first allocation
    SweepToFirst,
}

/// Allocation engine code an implementation address runs
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImplementationCode {
    /// Human readable name of the implementation
    pub label: String,
    /// Version within its strategy family
    pub version: u32,
    /// Rounding behavior of the routing step
    pub remainder: RemainderPolicy,
}

impl ImplementationCode {
    pub fn new<S: AsRef<str>>(label: S, version: u32) -> Self {
        Self {
            label: label.as_ref().to_string(),
            version,
            remainder: RemainderPolicy::Idle,
        }
    }

    /// Sets the remainder policy
    pub fn remainder(mut self, remainder: RemainderPolicy) -> Self {
        self.remainder = remainder;
        self
    }
}

/// Kinds of code that can live at an address
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Code {
    Registry,
    Factory,
    Strategy,
    Implementation(ImplementationCode),
    LendingMarket,
    ShareVault,
    PriceChecker,
    SwapRouter,
}

impl Code {
    fn kind(&self) -> &'static str {
        match self {
            Code::Registry => "registry",
            Code::Factory => "factory",
            Code::Strategy => "strategy",
            Code::Implementation(_) => "implementation",
            Code::LendingMarket => "lending market",
            Code::ShareVault => "share vault",
            Code::PriceChecker => "price checker",
            Code::SwapRouter => "swap router",
        }
    }
}

/// Returns the code deployed at `address`, if any
pub fn code_at(address: Address) -> Option<Code> {
    CODE.with(|code| code.borrow().get(&address).cloned())
}

/// Deploys `code` at a fresh address derived from `deployer` and the global nonce
pub fn deploy(deployer: Address, code: Code) -> Address {
    let nonce = DEPLOY_NONCE.with(|nonce| {
        let current = nonce.get();
        nonce.set(current + 1);
        current
    });
    let address = deployer.create(nonce);
    CODE.with(|table| table.borrow_mut().insert(address, code));
    address
}

/// Deploys `code` at a predetermined address. Fails if the address already holds code.
pub fn deploy_at(address: Address, code: Code) -> ManagerResult<()> {
    CODE.with(|table| {
        let mut binding = table.borrow_mut();
        if binding.contains_key(&address) {
            return Err(Violation::AlreadyDeployed(address.to_string()).into());
        }
        binding.insert(address, code);
        Ok(())
    })
}

/// Returns Err unless `address` holds code of the same kind as `expected`
pub fn ensure_code(address: Address, expected: Code) -> ManagerResult<()> {
    match code_at(address) {
        Some(found) if found.kind() == expected.kind() => Ok(()),
        _ => Err(missing_code(address, expected.kind())),
    }
}

/// Returns the allocation engine code deployed at `address`
pub fn implementation_code(address: Address) -> ManagerResult<ImplementationCode> {
    match code_at(address) {
        Some(Code::Implementation(code)) => Ok(code),
        _ => Err(missing_code(address, "implementation")),
    }
}

fn missing_code(address: Address, expected: &str) -> crate::utils::error::ManagerError {
    Violation::MissingCode {
        address: address.to_string(),
        expected: expected.to_string(),
    }
    .into()
}
