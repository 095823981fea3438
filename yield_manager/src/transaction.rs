//! Atomic execution of top-level operations
//!
//! Every public operation runs against the live state. A snapshot of all
//! state cells is taken before the operation starts and written back if the
//! operation returns an error, so an operation is either fully applied or
//! leaves no trace.
//!
//! ```plain
//!   snapshot ──► operation ──► Ok(_)  ──► keep live state
//!                          └─► Err(_) ──► restore snapshot
//! ```
//!
//! The journal and the registered external collaborators are not part of the
//! snapshot.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};

use crate::{
    code::Code,
    factory::FactoryData,
    protocols::{lending::LendingMarket, vault::ShareVault},
    registry::data::RegistryData,
    state::*,
    strategy::stable::StableStrategy,
    utils::error::ManagerResult,
};

/// Copy of every state cell an operation can touch
struct Snapshot {
    code: HashMap<Address, Code>,
    deploy_nonce: u64,
    ledger: HashMap<(Address, Address), U256>,
    registries: HashMap<Address, RegistryData>,
    strategies: HashMap<Address, StableStrategy>,
    factories: HashMap<Address, FactoryData>,
    lending_markets: HashMap<Address, LendingMarket>,
    vaults: HashMap<Address, ShareVault>,
}

impl Snapshot {
    fn take() -> Self {
        Self {
            code: CODE.with(|cell| cell.borrow().clone()),
            deploy_nonce: DEPLOY_NONCE.with(|cell| cell.get()),
            ledger: LEDGER.with(|cell| cell.borrow().clone()),
            registries: REGISTRY_STATE.with(|cell| cell.borrow().clone()),
            strategies: STRATEGY_STATE.with(|cell| cell.borrow().clone()),
            factories: FACTORY_STATE.with(|cell| cell.borrow().clone()),
            lending_markets: LENDING_MARKETS.with(|cell| cell.borrow().clone()),
            vaults: VAULTS.with(|cell| cell.borrow().clone()),
        }
    }

    fn restore(self) {
        CODE.with(|cell| *cell.borrow_mut() = self.code);
        DEPLOY_NONCE.with(|cell| cell.set(self.deploy_nonce));
        LEDGER.with(|cell| *cell.borrow_mut() = self.ledger);
        REGISTRY_STATE.with(|cell| *cell.borrow_mut() = self.registries);
        STRATEGY_STATE.with(|cell| *cell.borrow_mut() = self.strategies);
        FACTORY_STATE.with(|cell| *cell.borrow_mut() = self.factories);
        LENDING_MARKETS.with(|cell| *cell.borrow_mut() = self.lending_markets);
        VAULTS.with(|cell| *cell.borrow_mut() = self.vaults);
    }
}

/// Runs `operation` atomically: all of its state changes are discarded if it fails.
/// Nested calls are allowed; an inner failure only rolls back the inner call.
pub fn atomic<T, F>(operation: F) -> ManagerResult<T>
where
    F: FnOnce() -> ManagerResult<T>,
{
    let snapshot = Snapshot::take();
    let result = operation();
    if result.is_err() {
        snapshot.restore();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ledger, utils::error::ManagerError};

    #[test]
    fn test_atomic_keeps_changes_on_success() {
        let token = Address::repeat_byte(0x01);
        let holder = Address::repeat_byte(0x02);

        let result = atomic(|| ledger::mint(token, holder, U256::from(10)));

        assert!(result.is_ok());
        assert_eq!(ledger::balance_of(token, holder), U256::from(10));
    }

    #[test]
    fn test_atomic_discards_changes_on_failure() {
        let token = Address::repeat_byte(0x01);
        let holder = Address::repeat_byte(0x02);
        let other = Address::repeat_byte(0x03);
        ledger::mint(token, holder, U256::from(10)).unwrap();

        let result: ManagerResult<()> = atomic(|| {
            ledger::transfer(token, holder, other, U256::from(4))?;
            Err(ManagerError::Custom("abort".to_string()))
        });

        assert_eq!(result, Err(ManagerError::Custom("abort".to_string())));
        assert_eq!(ledger::balance_of(token, holder), U256::from(10));
        assert_eq!(ledger::balance_of(token, other), U256::ZERO);
    }

    #[test]
    fn test_inner_failure_only_rolls_back_inner_call() {
        let token = Address::repeat_byte(0x01);
        let holder = Address::repeat_byte(0x02);

        let result = atomic(|| {
            ledger::mint(token, holder, U256::from(1))?;
            let inner: ManagerResult<()> = atomic(|| {
                ledger::mint(token, holder, U256::from(100))?;
                Err(ManagerError::Locked)
            });
            assert_eq!(inner, Err(ManagerError::Locked));
            Ok(())
        });

        assert!(result.is_ok());
        assert_eq!(ledger::balance_of(token, holder), U256::from(1));
    }
}
