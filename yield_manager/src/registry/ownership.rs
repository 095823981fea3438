//! Ownership record of a registry
//!
//! Maps each user to the set of strategy instances they own, and each
//! instance back to its owner. An instance belongs to at most one user.

use std::collections::{BTreeSet, HashMap};

use alloy_primitives::Address;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OwnershipBook {
    by_user: HashMap<Address, BTreeSet<Address>>,
    owners: HashMap<Address, Address>,
}

impl OwnershipBook {
    /// Records `instance` as owned by `user`, moving it away from any previous owner.
    /// Returns `false` if the record already existed.
    pub fn add(&mut self, user: Address, instance: Address) -> bool {
        match self.owners.insert(instance, user) {
            Some(previous) if previous == user => return false,
            Some(previous) => {
                self.detach(previous, instance);
            }
            None => {}
        }
        self.by_user.entry(user).or_default().insert(instance);
        true
    }

    /// Moves `instance` to `new_owner` and returns the previous owner
    pub fn transfer(&mut self, instance: Address, new_owner: Address) -> Option<Address> {
        let previous = self.owner_of(instance)?;
        self.add(new_owner, instance);
        Some(previous)
    }

    fn detach(&mut self, user: Address, instance: Address) {
        if let Some(strategies) = self.by_user.get_mut(&user) {
            strategies.remove(&instance);
            if strategies.is_empty() {
                self.by_user.remove(&user);
            }
        }
    }

    pub fn owner_of(&self, instance: Address) -> Option<Address> {
        self.owners.get(&instance).copied()
    }

    pub fn contains(&self, user: Address, instance: Address) -> bool {
        self.owner_of(instance) == Some(user)
    }

    /// Instances owned by `user`, in address order
    pub fn strategies_of(&self, user: Address) -> Vec<Address> {
        self.by_user
            .get(&user)
            .map(|strategies| strategies.iter().copied().collect())
            .unwrap_or_default()
    }
}
