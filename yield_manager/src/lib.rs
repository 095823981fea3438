mod api;
mod cleanup;
mod code;
mod constants;
mod factory;
mod journal;
mod ledger;
mod pricing;
mod protocols;
mod registry;
mod state;
mod strategy;
mod transaction;
mod types;
mod utils;

#[cfg(test)]
mod test_utils;

pub use api::*;
pub use code::{ImplementationCode, RemainderPolicy};
pub use journal::{JournalCollection, JournalEntry, LogType};
pub use pricing::{PriceChecker, SwapRouter};
pub use protocols::vault::DepositHook;
pub use strategy::allocation::{Allocation, ProtocolRef};
pub use types::{
    AllocationQuery, ImplementationQuery, RegistryInitArgs, StrategyInput, StrategyQuery,
};
pub use utils::error::{ManagerError, ManagerResult, Role, Violation};
