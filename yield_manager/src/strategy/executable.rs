//! The executable strategy wrapper that runs the allocation engine.

use alloy_primitives::{Address, U256};

use crate::{
    code::{ensure_code, implementation_code, Code, ImplementationCode},
    journal::{JournalCollection, LogType},
    ledger,
    pricing::{gated_swap, SwapRoute},
    state::STRATEGY_STATE,
    utils::error::*,
};

use super::{
    allocation::{plan_route, plan_shortfall, reweight, RoutePlan},
    data::StrategyData,
    lock::Lock,
    positions,
    settings::StrategySettings,
};

#[derive(Clone, Default)]
pub struct ExecutableStrategy {
    /// Settings fixed at initialization
    pub settings: StrategySettings,
    /// Mutable state
    pub data: StrategyData,
    /// Reentrancy lock. Determines if the strategy is currently being executed.
    pub lock: Lock,
    /// Tracks if the lock acquisition was successful for the drop trait implementation
    acquired_lock: bool,
}

impl ExecutableStrategy {
    pub fn new(settings: StrategySettings, data: StrategyData, lock: Lock) -> ExecutableStrategy {
        ExecutableStrategy {
            settings,
            data,
            lock,
            acquired_lock: false,
        }
    }

    /// Loads the initialized strategy at `address` from the state
    pub fn load(address: Address) -> ManagerResult<Self> {
        let strategy = STRATEGY_STATE.with(|strategies| {
            strategies
                .borrow()
                .get(&address)
                .map(ExecutableStrategy::from)
        });

        match strategy {
            Some(strategy) => Ok(strategy),
            None => {
                ensure_code(address, Code::Strategy)?;
                Err(Violation::NotInitialized.into())
            }
        }
    }

    /// Replaces the strategy in the state with this instance
    pub fn apply_change(&self) {
        STRATEGY_STATE.with(|strategies| {
            strategies
                .borrow_mut()
                .insert(self.settings.address, self.into());
        });
    }

    /// Locks the strategy and persists the lock.
    /// Must be called before any external call is made.
    pub(super) fn lock(&mut self) -> ManagerResult<()> {
        self.lock.try_lock().map(|_| {
            self.acquired_lock = true;
            self.apply_change();
        })
    }

    /// Unlocks the strategy if this instance holds the lock.
    pub fn unlock(&mut self) {
        if self.acquired_lock {
            self.lock.unlock(true);
            self.acquired_lock = false;
            self.apply_change();
        }
    }

    fn address(&self) -> Address {
        self.settings.address
    }

    /// Code of the implementation the instance currently points at
    fn engine(&self) -> ManagerResult<ImplementationCode> {
        implementation_code(self.data.implementation)
    }

    /// Base token held by the instance and not deployed in any protocol
    pub fn idle_balance(&self) -> U256 {
        ledger::balance_of(self.settings.token, self.address())
    }

    /// Base token value of every allocation, in allocation order
    pub fn positions(&self) -> ManagerResult<Vec<U256>> {
        self.data
            .allocations
            .iter()
            .map(|allocation| positions::position(self.address(), allocation.protocol))
            .collect()
    }

    /// Idle balance plus every protocol position
    pub fn total_balance(&self) -> ManagerResult<U256> {
        let deployed = self
            .positions()?
            .into_iter()
            .try_fold(U256::ZERO, |total, position| total.checked_add(position))
            .ok_or_else(|| arithmetic_err("Total balance overflowed."))?;
        deployed
            .checked_add(self.idle_balance())
            .ok_or_else(|| arithmetic_err("Total balance overflowed."))
    }

    /// Pulls `amount` of base token from `from` and routes it into the protocols
    pub fn deposit(&mut self, from: Address, amount: U256) -> ManagerResult<RoutePlan> {
        if amount.is_zero() {
            return Err(Violation::ZeroAmount.into());
        }
        self.lock()?;

        ledger::transfer(self.settings.token, from, self.address(), amount)?;
        self.route(amount)
    }

    /// Splits `amount` of idle base token over the allocations.
    /// Zero-sized legs are skipped.
    fn route(&mut self, amount: U256) -> ManagerResult<RoutePlan> {
        let policy = self.engine()?.remainder;
        let plan = plan_route(amount, &self.data.allocations, policy)?;

        for (allocation, leg) in self.data.allocations.iter().zip(&plan.legs) {
            if !leg.is_zero() {
                positions::supply(self.address(), allocation.protocol, *leg)?;
            }
        }

        Ok(plan)
    }

    /// Sends `amount` of base token to `to`, pulling any shortfall out of the protocols
    pub fn withdraw(&mut self, to: Address, amount: U256) -> ManagerResult<()> {
        if amount.is_zero() {
            return Err(Violation::ZeroAmount.into());
        }
        self.lock()?;

        let current = self.positions()?;
        let idle = self.idle_balance();
        let total = self.total_balance()?;
        if amount > total {
            return Err(insufficient_funds(amount, total));
        }

        if idle < amount {
            let pulls = plan_shortfall(amount - idle, &self.data.allocations, &current)?;
            for (allocation, pull) in self.data.allocations.iter().zip(pulls) {
                if !pull.is_zero() {
                    positions::pull(self.address(), allocation.protocol, pull)?;
                }
            }
        }

        let available = self.idle_balance();
        if available < amount {
            return Err(insufficient_funds(amount, available));
        }

        ledger::transfer(self.settings.token, self.address(), to, amount)
    }

    /// Applies `weights` to the allocations, exits every position and redeploys
    /// the whole idle balance under the new weights.
    pub fn rebalance(
        &mut self,
        weights: &[u16],
        journal: &mut JournalCollection,
    ) -> ManagerResult<RoutePlan> {
        let allocations = reweight(&self.data.allocations, weights)?;
        self.lock()?;

        // The new weights are committed before any protocol is called
        self.data.allocations(allocations);
        self.apply_change();

        self.exit_all()?;
        let idle = self.idle_balance();
        if idle.is_zero() {
            return Err(Violation::ZeroAmount.into());
        }
        journal.append_note(
            Ok(()),
            LogType::Allocation,
            format!("Exited all positions, redeploying {} under {:?}.", idle, weights),
        );

        self.route(idle)
    }

    fn exit_all(&self) -> ManagerResult<()> {
        for allocation in self.data.allocations.iter() {
            positions::exit(self.address(), allocation.protocol)?;
        }
        Ok(())
    }

    /// Swaps every nonzero reward token balance into the base token and routes
    /// the proceeds. Returns the amount of base token harvested.
    pub fn harvest(&mut self, journal: &mut JournalCollection) -> ManagerResult<U256> {
        self.lock()?;

        let route = SwapRoute {
            holder: self.address(),
            router: self.settings.swap_router,
            price_checker: self.settings.price_checker,
            slippage_bps: self.settings.slippage_bps,
        };

        let mut harvested = U256::ZERO;
        for reward_token in self.data.reward_tokens.clone() {
            let balance = ledger::balance_of(reward_token, self.address());
            if balance.is_zero() {
                continue;
            }

            let amount_out = gated_swap(route, reward_token, self.settings.token, balance)?;
            journal.append_note(
                Ok(()),
                LogType::Harvest,
                format!(
                    "Swapped {} of {} into {} of the base token.",
                    balance, reward_token, amount_out
                ),
            );
            harvested = harvested
                .checked_add(amount_out)
                .ok_or_else(|| arithmetic_err("Harvested amount overflowed."))?;
        }

        if !harvested.is_zero() {
            self.route(harvested)?;
        }

        Ok(harvested)
    }

    /// Sends `amount` of `token` held idle by the instance to `to`
    pub fn recover(&mut self, token: Address, to: Address, amount: U256) -> ManagerResult<()> {
        if amount.is_zero() {
            return Err(Violation::ZeroAmount.into());
        }
        self.lock()?;

        ledger::transfer(token, self.address(), to, amount)
    }
}

impl Drop for ExecutableStrategy {
    /// Unlocks the strategy when the instance goes out of scope
    fn drop(&mut self) {
        self.unlock();
    }
}
