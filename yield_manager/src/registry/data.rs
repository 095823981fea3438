//! Registry state

use std::collections::{BTreeSet, HashMap};

use alloy_primitives::Address;

use crate::types::RegistryConfig;

use super::{implementation::ImplementationRecord, ownership::OwnershipBook};

#[derive(Clone, Debug, PartialEq)]
pub struct RegistryData {
    /// Privileged caller
    pub admin: Address,
    /// Designated operational role
    pub operator: Address,
    /// Factories allowed to register strategies
    pub factories: BTreeSet<Address>,
    pub implementations: HashMap<Address, ImplementationRecord>,
    /// Latest implementation of every strategy type
    pub latest: HashMap<u64, Address>,
    /// Id handed out to the next new strategy type
    pub next_type_id: u64,
    pub ownership: OwnershipBook,
}

impl From<RegistryConfig> for RegistryData {
    fn from(value: RegistryConfig) -> Self {
        Self {
            admin: value.admin,
            operator: value.operator,
            factories: BTreeSet::new(),
            implementations: HashMap::new(),
            latest: HashMap::new(),
            next_type_id: 1,
            ownership: OwnershipBook::default(),
        }
    }
}

impl RegistryData {
    /// Sets the operator.
    pub fn operator(&mut self, operator: Address) -> &mut Self {
        self.operator = operator;
        self
    }

    /// Sets the admin.
    pub fn admin(&mut self, admin: Address) -> &mut Self {
        self.admin = admin;
        self
    }

    /// Returns `true` if `caller` may register strategies
    pub fn is_privileged(&self, caller: Address) -> bool {
        caller == self.admin || self.factories.contains(&caller)
    }

    pub fn is_whitelisted(&self, implementation: Address) -> bool {
        self.implementations
            .get(&implementation)
            .is_some_and(|record| record.whitelisted)
    }

    /// Returns `true` if `implementation` is the latest of its strategy type
    pub fn is_latest(&self, implementation: Address) -> bool {
        self.implementations
            .get(&implementation)
            .and_then(|record| self.latest.get(&record.strategy_type))
            == Some(&implementation)
    }
}
