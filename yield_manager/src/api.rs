//! Public entry points
//!
//! Every mutating call runs inside `transaction::atomic` and records a journal
//! collection with its outcome. `caller` is the authenticated identity of
//! whoever makes the call.

use std::rc::Rc;

use alloy_primitives::{Address, U256};

use crate::{
    cleanup,
    code::{deploy, Code, ImplementationCode},
    factory,
    journal::{JournalCollection, LogType},
    ledger,
    pricing::{self, PriceChecker, SwapRouter},
    protocols::{lending, vault},
    registry,
    state::JOURNAL,
    strategy::{allocation::Allocation, run},
    transaction::atomic,
    types::*,
    utils::error::{ManagerError, ManagerResult},
};

/// Runs `operation` atomically and records its outcome under `description`
fn execute<T, F>(strategy: Option<Address>, description: &str, operation: F) -> ManagerResult<T>
where
    F: FnOnce(&mut JournalCollection) -> ManagerResult<T>,
{
    let mut journal = JournalCollection::open(strategy);
    let result = atomic(|| operation(&mut journal));
    journal.append_result(&result, description);
    result
}

// HOST

/// Deploys a registry configured by `args`
pub fn create_registry(deployer: Address, args: RegistryInitArgs) -> ManagerResult<Address> {
    execute(None, "Registry creation finished.", |journal| {
        let registry = registry::create_registry(deployer, RegistryConfig::try_from(args)?)?;
        journal.append_note(
            Ok(()),
            LogType::Registry,
            format!("Deployed registry at {}.", registry),
        );
        Ok(registry)
    })
}

/// Deploys a factory bound to `registry`
pub fn create_factory(deployer: Address, registry: Address) -> ManagerResult<Address> {
    execute(None, "Factory creation finished.", |_| {
        factory::create_factory(deployer, registry)
    })
}

/// Deploys allocation engine code and returns its address
pub fn deploy_implementation(deployer: Address, code: ImplementationCode) -> Address {
    deploy(deployer, Code::Implementation(code))
}

/// Deploys uninitialized strategy code, for instances that are not created by a factory
pub fn deploy_strategy_code(deployer: Address) -> Address {
    deploy(deployer, Code::Strategy)
}

pub fn deploy_lending_market(deployer: Address, underlying: Address) -> Address {
    lending::deploy_lending_market(deployer, underlying)
}

pub fn deploy_share_vault(deployer: Address, asset: Address) -> Address {
    vault::deploy_share_vault(deployer, asset)
}

pub fn register_price_checker(deployer: Address, checker: Rc<dyn PriceChecker>) -> Address {
    pricing::register_price_checker(deployer, checker)
}

pub fn register_swap_router(deployer: Address, router: Rc<dyn SwapRouter>) -> Address {
    pricing::register_swap_router(deployer, router)
}

/// Makes every mutating call of a lending market return `code`
pub fn set_lending_failure_code(market: Address, code: Option<u64>) -> ManagerResult<()> {
    lending::set_failure_code(market, code)
}

/// Raises the exchange rate of a lending market
pub fn accrue_lending_interest(market: Address, exchange_rate: U256) -> ManagerResult<()> {
    atomic(|| lending::accrue_interest(market, exchange_rate))
}

pub fn set_vault_paused(vault: Address, paused: bool) -> ManagerResult<()> {
    vault::set_paused(vault, paused)
}

/// Installs code the vault runs after every deposit
pub fn set_vault_deposit_hook(vault: Address, hook: Option<vault::DepositHook>) -> ManagerResult<()> {
    vault::set_deposit_hook(vault, hook)
}

pub fn mint_tokens(token: Address, to: Address, amount: U256) -> ManagerResult<()> {
    ledger::mint(token, to, amount)
}

pub fn transfer_tokens(caller: Address, token: Address, to: Address, amount: U256) -> ManagerResult<()> {
    atomic(|| ledger::transfer(token, caller, to, amount))
}

pub fn balance_of(token: Address, holder: Address) -> U256 {
    ledger::balance_of(token, holder)
}

// REGISTRY

/// Whitelists `implementation` and returns its strategy type id
pub fn whitelist_implementation(
    caller: Address,
    registry: Address,
    implementation: Address,
    strategy_type: u64,
) -> ManagerResult<u64> {
    execute(None, "Implementation whitelisting finished.", |journal| {
        let assigned =
            registry::whitelist_implementation(caller, registry, implementation, strategy_type)?;
        journal.append_note(
            Ok(()),
            LogType::Registry,
            format!(
                "Whitelisted {} as the latest implementation of type {}.",
                implementation, assigned
            ),
        );
        Ok(assigned)
    })
}

pub fn add_strategy(
    caller: Address,
    registry: Address,
    user: Address,
    instance: Address,
) -> ManagerResult<()> {
    execute(Some(instance), "Strategy registration finished.", |_| {
        registry::add_strategy(caller, registry, user, instance)
    })
}

pub fn upgrade_strategy(
    caller: Address,
    registry: Address,
    instance: Address,
    new_implementation: Address,
) -> ManagerResult<()> {
    execute(Some(instance), "Strategy upgrade finished.", |journal| {
        registry::upgrade_strategy(caller, registry, instance, new_implementation)?;
        journal.append_note(
            Ok(()),
            LogType::Upgrade,
            format!("Upgraded to {}.", new_implementation),
        );
        Ok(())
    })
}

pub fn update_strategy_owner(
    caller: Address,
    registry: Address,
    new_owner: Address,
) -> ManagerResult<()> {
    execute(Some(caller), "Ownership update finished.", |_| {
        registry::update_strategy_owner(caller, registry, new_owner)
    })
}

pub fn set_operator(caller: Address, registry: Address, operator: Address) -> ManagerResult<()> {
    execute(None, "Operator update finished.", |_| {
        registry::set_operator(caller, registry, operator)
    })
}

pub fn set_factory(
    caller: Address,
    registry: Address,
    factory: Address,
    enabled: bool,
) -> ManagerResult<()> {
    execute(None, "Factory authorization finished.", |_| {
        registry::set_factory(caller, registry, factory, enabled)
    })
}

pub fn transfer_admin(caller: Address, registry: Address, new_admin: Address) -> ManagerResult<()> {
    execute(None, "Admin transfer finished.", |_| {
        registry::transfer_admin(caller, registry, new_admin)
    })
}

pub fn is_user_strategy(registry: Address, user: Address, instance: Address) -> ManagerResult<bool> {
    registry::is_user_strategy(registry, user, instance)
}

pub fn user_strategies(registry: Address, user: Address) -> ManagerResult<Vec<Address>> {
    registry::user_strategies(registry, user)
}

pub fn strategy_owner(registry: Address, instance: Address) -> ManagerResult<Option<Address>> {
    registry::strategy_owner(registry, instance)
}

pub fn is_whitelisted(registry: Address, implementation: Address) -> ManagerResult<bool> {
    registry::is_whitelisted(registry, implementation)
}

pub fn implementation_query(
    registry: Address,
    implementation: Address,
) -> ManagerResult<ImplementationQuery> {
    let record = registry::implementation_record(registry, implementation)?
        .ok_or(ManagerError::NonExistentValue)?;
    let latest = registry::is_latest(registry, implementation)?;
    Ok(ImplementationQuery::new(&record, latest))
}

pub fn latest_implementation(registry: Address, strategy_type: u64) -> ManagerResult<Address> {
    registry::latest_implementation(registry, strategy_type)
}

pub fn get_operator_address(registry: Address) -> ManagerResult<Address> {
    registry::operator(registry)
}

pub fn registry_admin(registry: Address) -> ManagerResult<Address> {
    registry::admin(registry)
}

// FACTORY

/// Deploys, initializes and registers a strategy instance through `factory`
pub fn deploy_strategy(
    caller: Address,
    factory: Address,
    input: StrategyInput,
) -> ManagerResult<Address> {
    execute(None, "Strategy deployment finished.", |journal| {
        let instance = factory::deploy_strategy(caller, factory, StrategyInitArgs::try_from(input)?)?;
        journal.append_note(
            Ok(()),
            LogType::Registry,
            format!("Deployed and registered strategy {}.", instance),
        );
        Ok(instance)
    })
}

pub fn compute_strategy_address(factory: Address, owner: Address) -> ManagerResult<Address> {
    factory::compute_address(factory, owner)
}

/// Registry every instance deployed by `factory` is bound to
pub fn factory_registry(factory: Address) -> ManagerResult<Address> {
    factory::registry_of(factory)
}

// STRATEGY

/// One-time initialization of strategy code deployed with `deploy_strategy_code`
pub fn initialize_strategy(instance: Address, input: StrategyInput) -> ManagerResult<()> {
    execute(Some(instance), "Strategy initialization finished.", |_| {
        run::initialize(instance, StrategyInitArgs::try_from(input)?)
    })
}

pub fn deposit(caller: Address, instance: Address, amount: U256) -> ManagerResult<()> {
    execute(Some(instance), "Deposit finished.", |journal| {
        run::deposit(caller, instance, amount, journal)
    })
}

pub fn withdraw(caller: Address, instance: Address, amount: U256) -> ManagerResult<()> {
    execute(Some(instance), "Withdrawal finished.", |journal| {
        run::withdraw(caller, instance, amount, journal)
    })
}

pub fn update_position(
    caller: Address,
    instance: Address,
    split_a: u16,
    split_b: u16,
) -> ManagerResult<()> {
    execute(Some(instance), "Position update finished.", |journal| {
        run::update_position(caller, instance, split_a, split_b, journal)
    })
}

/// Applies one weight per allocation and redeploys all funds
pub fn rebalance(caller: Address, instance: Address, weights: Vec<u16>) -> ManagerResult<()> {
    execute(Some(instance), "Rebalance finished.", |journal| {
        run::rebalance(caller, instance, &weights, journal)
    })
}

/// Returns the amount of base token harvested
pub fn harvest_rewards(caller: Address, instance: Address) -> ManagerResult<U256> {
    execute(Some(instance), "Harvest finished.", |journal| {
        run::harvest_rewards(caller, instance, journal)
    })
}

pub fn recover(
    caller: Address,
    instance: Address,
    token: Address,
    to: Address,
    amount: U256,
) -> ManagerResult<()> {
    execute(Some(instance), "Recovery finished.", |_| {
        run::recover(caller, instance, token, to, amount)
    })
}

pub fn transfer_ownership(caller: Address, instance: Address, new_owner: Address) -> ManagerResult<()> {
    execute(Some(instance), "Ownership transfer finished.", |journal| {
        run::transfer_ownership(caller, instance, new_owner, journal)
    })
}

pub fn add_reward_token(caller: Address, instance: Address, token: Address) -> ManagerResult<()> {
    execute(Some(instance), "Reward token addition finished.", |_| {
        run::add_reward_token(caller, instance, token)
    })
}

pub fn remove_reward_token(caller: Address, instance: Address, token: Address) -> ManagerResult<()> {
    execute(Some(instance), "Reward token removal finished.", |_| {
        run::remove_reward_token(caller, instance, token)
    })
}

pub fn instance_owner(instance: Address) -> ManagerResult<Address> {
    run::owner(instance)
}

pub fn registry_ref(instance: Address) -> ManagerResult<Address> {
    run::registry_ref(instance)
}

pub fn strategy_type(instance: Address) -> ManagerResult<u64> {
    run::strategy_type(instance)
}

pub fn current_implementation(instance: Address) -> ManagerResult<Address> {
    run::current_implementation(instance)
}

pub fn split_a(instance: Address) -> ManagerResult<u16> {
    run::split_a(instance)
}

pub fn split_b(instance: Address) -> ManagerResult<u16> {
    run::split_b(instance)
}

pub fn allocations(instance: Address) -> ManagerResult<Vec<Allocation>> {
    run::allocations(instance)
}

pub fn reward_tokens(instance: Address) -> ManagerResult<Vec<Address>> {
    run::reward_tokens(instance)
}

pub fn idle_balance(instance: Address) -> ManagerResult<U256> {
    run::idle_balance(instance)
}

pub fn positions(instance: Address) -> ManagerResult<Vec<U256>> {
    run::positions(instance)
}

pub fn total_balance(instance: Address) -> ManagerResult<U256> {
    run::total_balance(instance)
}

pub fn strategy_query(instance: Address) -> ManagerResult<StrategyQuery> {
    run::query(instance)
}

// JOURNAL

/// Returns the newest `depth` journal collections, oldest first
pub fn get_logs(depth: u64) -> Vec<JournalCollection> {
    JOURNAL.with(|journal| {
        let binding = journal.borrow();
        let depth = usize::try_from(depth).unwrap_or(usize::MAX).min(binding.len());
        binding[binding.len() - depth..].to_vec()
    })
}

/// Prunes the journal and records the cleanup
pub fn daily_cleanup() {
    cleanup::daily_cleanup();
}
