//! Strategy representation kept in the state

use crate::{
    state::STRATEGY_STATE,
    utils::error::{ManagerResult, Violation},
};

use super::{
    data::StrategyData, executable::ExecutableStrategy, lock::Lock, settings::StrategySettings,
};

/// Stable strategy struct
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StableStrategy {
    /// Settings fixed at initialization
    pub settings: StrategySettings,
    /// Mutable state
    pub data: StrategyData,
    /// Reentrancy lock. Determines if the strategy is currently being executed.
    pub lock: Lock,
}

impl StableStrategy {
    /// Builder-style setter functions for the struct

    /// Set the strategy settings
    pub fn settings(&mut self, settings: StrategySettings) -> &mut Self {
        self.settings = settings;
        self
    }

    /// Set the strategy data
    pub fn data(&mut self, data: StrategyData) -> &mut Self {
        self.data = data;
        self
    }

    /// Mint the strategy by adding it to the state.
    /// Fails if the address already carries an initialized strategy.
    pub fn mint(&self) -> ManagerResult<()> {
        STRATEGY_STATE.with(|strategies| {
            let mut binding = strategies.borrow_mut();
            if binding.contains_key(&self.settings.address) {
                return Err(Violation::AlreadyInitialized.into());
            }
            binding.insert(self.settings.address, self.clone());
            Ok(())
        })
    }
}

impl From<&StableStrategy> for ExecutableStrategy {
    fn from(value: &StableStrategy) -> Self {
        ExecutableStrategy::new(value.settings.clone(), value.data.clone(), value.lock)
    }
}

impl From<&ExecutableStrategy> for StableStrategy {
    fn from(value: &ExecutableStrategy) -> Self {
        StableStrategy {
            settings: value.settings.clone(),
            data: value.data.clone(),
            lock: value.lock,
        }
    }
}
