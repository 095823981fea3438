//! Mutable strategy data

use std::collections::BTreeSet;

use alloy_primitives::Address;

use super::allocation::Allocation;

/// Struct containing all mutable data of a strategy instance
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StrategyData {
    /// Current owner. Mirrored by the registry's ownership record.
    pub owner: Address,
    /// Implementation the instance dispatches its engine operations to
    pub implementation: Address,
    /// Protocols and their basis points. Always sums to 10000 once initialized.
    pub allocations: Vec<Allocation>,
    /// Tokens that `harvest_rewards` swaps into the base token
    pub reward_tokens: BTreeSet<Address>,
    /// Set by `initialize`
    pub initialized: bool,
}

impl StrategyData {
    /// Sets the owner of the instance.
    pub fn owner(&mut self, owner: Address) -> &mut Self {
        self.owner = owner;
        self
    }

    /// Sets the implementation pointer.
    pub fn implementation(&mut self, implementation: Address) -> &mut Self {
        self.implementation = implementation;
        self
    }

    /// Sets the allocation list.
    pub fn allocations(&mut self, allocations: Vec<Allocation>) -> &mut Self {
        self.allocations = allocations;
        self
    }

    /// Sets the reward tokens.
    pub fn reward_tokens<I: IntoIterator<Item = Address>>(&mut self, reward_tokens: I) -> &mut Self {
        self.reward_tokens = reward_tokens.into_iter().collect();
        self
    }

    /// Marks the instance as initialized.
    pub fn initialized(&mut self, initialized: bool) -> &mut Self {
        self.initialized = initialized;
        self
    }
}
