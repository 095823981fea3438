use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use alloy_primitives::{Address, U256};

use crate::{
    code::Code,
    factory::FactoryData,
    journal::JournalCollection,
    pricing::{PriceChecker, SwapRouter},
    protocols::{lending::LendingMarket, vault::ShareVault},
    registry::data::RegistryData,
    strategy::stable::StableStrategy,
};

thread_local! {
    /// Kind of code deployed at each address
    pub static CODE: RefCell<HashMap<Address, Code>> = RefCell::new(HashMap::new());
    /// Nonce used to derive addresses of newly deployed code
    pub static DEPLOY_NONCE: Cell<u64> = const { Cell::new(0) };
    /// Token balances keyed by `(token, holder)`
    pub static LEDGER: RefCell<HashMap<(Address, Address), U256>> = RefCell::new(HashMap::new());
    pub static REGISTRY_STATE: RefCell<HashMap<Address, RegistryData>> = RefCell::new(HashMap::new());
    pub static STRATEGY_STATE: RefCell<HashMap<Address, StableStrategy>> = RefCell::new(HashMap::new());
    pub static FACTORY_STATE: RefCell<HashMap<Address, FactoryData>> = RefCell::new(HashMap::new());
    pub static LENDING_MARKETS: RefCell<HashMap<Address, LendingMarket>> = RefCell::new(HashMap::new());
    pub static VAULTS: RefCell<HashMap<Address, ShareVault>> = RefCell::new(HashMap::new());

    /// External collaborators. They hold no state of ours and are not part of snapshots.
    pub static PRICE_CHECKERS: RefCell<HashMap<Address, Rc<dyn PriceChecker>>> = RefCell::new(HashMap::new());
    pub static SWAP_ROUTERS: RefCell<HashMap<Address, Rc<dyn SwapRouter>>> = RefCell::new(HashMap::new());

    /// Journal collections, newest last. Kept out of snapshots so failed operations stay logged.
    pub static JOURNAL: RefCell<Vec<JournalCollection>> = const { RefCell::new(Vec::new()) };
}

/// Pushes a closed journal collection to the journal
pub fn insert_journal_collection(collection: JournalCollection) {
    JOURNAL.with(|journal| journal.borrow_mut().push(collection));
}
