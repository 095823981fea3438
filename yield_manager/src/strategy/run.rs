//! Strategy instance entry points
//!
//! Each function authorizes the caller, then drives an `ExecutableStrategy`.
//! The executable takes the instance's lock before it calls out and releases
//! it when dropped at the end of the function.

use alloy_primitives::{Address, U256};

use crate::{
    code::{ensure_code, implementation_code, Code},
    constants::{BPS_DENOMINATOR, NEW_STRATEGY_TYPE},
    journal::{JournalCollection, LogType},
    registry,
    state::STRATEGY_STATE,
    types::{StrategyInitArgs, StrategyQuery},
    utils::{common::ensure_not_null, error::*},
};

use super::{
    allocation::{validate_weights, Allocation, ProtocolRef},
    data::StrategyData,
    executable::ExecutableStrategy,
    positions::underlying,
    settings::StrategySettings,
    stable::StableStrategy,
};

/// Reads the initialized strategy at `instance` without taking its lock
fn stable(instance: Address) -> ManagerResult<StableStrategy> {
    let strategy = STRATEGY_STATE.with(|strategies| strategies.borrow().get(&instance).cloned());
    match strategy {
        Some(strategy) => Ok(strategy),
        None => {
            ensure_code(instance, Code::Strategy)?;
            Err(Violation::NotInitialized.into())
        }
    }
}

fn only_owner(caller: Address, strategy: &ExecutableStrategy) -> ManagerResult<()> {
    if caller != strategy.data.owner {
        return Err(ManagerError::Unauthorized(Role::Owner));
    }
    Ok(())
}

/// The designated operator, unless it also owns the instance
fn only_operator(caller: Address, strategy: &ExecutableStrategy) -> ManagerResult<()> {
    if caller == strategy.data.owner || caller != registry::operator(strategy.settings.registry)? {
        return Err(ManagerError::Unauthorized(Role::Operator));
    }
    Ok(())
}

fn only_owner_or_operator(caller: Address, strategy: &ExecutableStrategy) -> ManagerResult<()> {
    if caller != strategy.data.owner && caller != registry::operator(strategy.settings.registry)? {
        return Err(ManagerError::Unauthorized(Role::OwnerOrOperator));
    }
    Ok(())
}

fn ensure_reward_token(strategy: &ExecutableStrategy, token: Address) -> ManagerResult<()> {
    ensure_not_null(token, "reward_token")?;
    if token == strategy.settings.token {
        return Err(Violation::BaseTokenAsReward.into());
    }
    Ok(())
}

/// One-time initialization of the strategy code deployed at `instance`
pub fn initialize(instance: Address, args: StrategyInitArgs) -> ManagerResult<()> {
    ensure_code(instance, Code::Strategy)?;
    if STRATEGY_STATE.with(|strategies| strategies.borrow().contains_key(&instance)) {
        return Err(Violation::AlreadyInitialized.into());
    }

    for (address, field) in [
        (args.owner, "owner"),
        (args.registry, "registry"),
        (args.implementation, "implementation"),
        (args.protocol_a, "protocol_a"),
        (args.protocol_b, "protocol_b"),
        (args.token, "token"),
        (args.price_checker, "price_checker"),
        (args.swap_router, "swap_router"),
    ] {
        ensure_not_null(address, field)?;
    }
    if args.strategy_type == NEW_STRATEGY_TYPE {
        return Err(Violation::InvalidStrategyType.into());
    }
    if args.slippage_bps > BPS_DENOMINATOR {
        return Err(Violation::SlippageOutOfRange(args.slippage_bps).into());
    }
    validate_weights(&[args.split_a, args.split_b])?;

    ensure_code(args.registry, Code::Registry)?;
    implementation_code(args.implementation)?;
    ensure_code(args.protocol_a, Code::LendingMarket)?;
    ensure_code(args.protocol_b, Code::ShareVault)?;
    ensure_code(args.price_checker, Code::PriceChecker)?;
    ensure_code(args.swap_router, Code::SwapRouter)?;

    let allocations = vec![
        Allocation::new(ProtocolRef::Lending(args.protocol_a), args.split_a),
        Allocation::new(ProtocolRef::Vault(args.protocol_b), args.split_b),
    ];
    for (allocation, field) in allocations.iter().zip(["protocol_a", "protocol_b"]) {
        if underlying(instance, allocation.protocol)? != args.token {
            return Err(Violation::AssetMismatch(field.to_string()).into());
        }
    }

    let mut settings = StrategySettings::default();
    settings
        .address(instance)
        .registry(args.registry)
        .strategy_type(args.strategy_type)
        .token(args.token)
        .price_checker(args.price_checker)
        .swap_router(args.swap_router)
        .slippage_bps(args.slippage_bps);

    let mut strategy = ExecutableStrategy::new(settings, StrategyData::default(), Default::default());
    for token in args.reward_tokens.iter() {
        ensure_reward_token(&strategy, *token)?;
    }
    strategy
        .data
        .owner(args.owner)
        .implementation(args.implementation)
        .allocations(allocations)
        .reward_tokens(args.reward_tokens)
        .initialized(true);

    StableStrategy::from(&strategy).mint()
}

/// Deposits `amount` of base token from the owner and routes it into the protocols
pub fn deposit(
    caller: Address,
    instance: Address,
    amount: U256,
    journal: &mut JournalCollection,
) -> ManagerResult<()> {
    let mut strategy = ExecutableStrategy::load(instance)?;
    only_owner(caller, &strategy)?;

    let plan = strategy.deposit(caller, amount)?;
    journal.append_note(
        Ok(()),
        LogType::Allocation,
        format!(
            "Deposited {}: routed {:?}, {} left idle.",
            amount, plan.legs, plan.remainder
        ),
    );
    Ok(())
}

/// Withdraws `amount` of base token to the owner
pub fn withdraw(
    caller: Address,
    instance: Address,
    amount: U256,
    journal: &mut JournalCollection,
) -> ManagerResult<()> {
    let mut strategy = ExecutableStrategy::load(instance)?;
    only_owner(caller, &strategy)?;

    strategy.withdraw(caller, amount)?;
    journal.append_note(
        Ok(()),
        LogType::Allocation,
        format!("Withdrew {} to the owner.", amount),
    );
    Ok(())
}

/// Moves the two-way split to `(split_a, split_b)` and redeploys all funds
pub fn update_position(
    caller: Address,
    instance: Address,
    split_a: u16,
    split_b: u16,
    journal: &mut JournalCollection,
) -> ManagerResult<()> {
    rebalance(caller, instance, &[split_a, split_b], journal)
}

/// Applies one weight per allocation and redeploys all funds
pub fn rebalance(
    caller: Address,
    instance: Address,
    weights: &[u16],
    journal: &mut JournalCollection,
) -> ManagerResult<()> {
    let mut strategy = ExecutableStrategy::load(instance)?;
    only_operator(caller, &strategy)?;

    let plan = strategy.rebalance(weights, journal)?;
    journal.append_note(
        Ok(()),
        LogType::Allocation,
        format!("Rebalanced into {:?}.", plan.legs),
    );
    Ok(())
}

/// Swaps reward tokens into the base token and routes the proceeds
pub fn harvest_rewards(
    caller: Address,
    instance: Address,
    journal: &mut JournalCollection,
) -> ManagerResult<U256> {
    let mut strategy = ExecutableStrategy::load(instance)?;
    only_owner_or_operator(caller, &strategy)?;

    strategy.harvest(journal)
}

/// Sends `amount` of `token` held idle by the instance to `to`
pub fn recover(
    caller: Address,
    instance: Address,
    token: Address,
    to: Address,
    amount: U256,
) -> ManagerResult<()> {
    let mut strategy = ExecutableStrategy::load(instance)?;
    only_owner(caller, &strategy)?;
    ensure_not_null(to, "to")?;

    strategy.recover(token, to, amount)
}

/// Hands the instance over to `new_owner` and moves it in the registry's ownership record
pub fn transfer_ownership(
    caller: Address,
    instance: Address,
    new_owner: Address,
    journal: &mut JournalCollection,
) -> ManagerResult<()> {
    let mut strategy = ExecutableStrategy::load(instance)?;
    only_owner(caller, &strategy)?;
    ensure_not_null(new_owner, "new_owner")?;
    if new_owner == strategy.data.owner {
        return Err(Violation::SameOwner.into());
    }
    strategy.lock()?;

    // Committed before the registry reads it back
    strategy.data.owner(new_owner);
    strategy.apply_change();

    registry::update_strategy_owner(instance, strategy.settings.registry, new_owner)?;
    journal.append_note(
        Ok(()),
        LogType::Registry,
        format!("Ownership moved from {} to {}.", caller, new_owner),
    );
    Ok(())
}

/// Adds `token` to the reward tokens. Adding a present token is a no-op.
pub fn add_reward_token(caller: Address, instance: Address, token: Address) -> ManagerResult<()> {
    let mut strategy = ExecutableStrategy::load(instance)?;
    only_owner(caller, &strategy)?;
    ensure_reward_token(&strategy, token)?;
    strategy.lock()?;

    strategy.data.reward_tokens.insert(token);
    strategy.apply_change();
    Ok(())
}

/// Removes `token` from the reward tokens. Removing an absent token is a no-op.
pub fn remove_reward_token(caller: Address, instance: Address, token: Address) -> ManagerResult<()> {
    let mut strategy = ExecutableStrategy::load(instance)?;
    only_owner(caller, &strategy)?;
    strategy.lock()?;

    strategy.data.reward_tokens.remove(&token);
    strategy.apply_change();
    Ok(())
}

/// Points the instance at `new_implementation`. Only the instance's registry may call this.
pub fn upgrade_to(caller: Address, instance: Address, new_implementation: Address) -> ManagerResult<()> {
    let mut strategy = ExecutableStrategy::load(instance)?;
    if caller != strategy.settings.registry {
        return Err(ManagerError::Unauthorized(Role::Registry));
    }
    implementation_code(new_implementation)?;
    strategy.lock()?;

    strategy.data.implementation(new_implementation);
    strategy.apply_change();
    Ok(())
}

pub fn owner(instance: Address) -> ManagerResult<Address> {
    Ok(stable(instance)?.data.owner)
}

pub fn registry_ref(instance: Address) -> ManagerResult<Address> {
    Ok(stable(instance)?.settings.registry)
}

pub fn strategy_type(instance: Address) -> ManagerResult<u64> {
    Ok(stable(instance)?.settings.strategy_type)
}

/// Implementation the instance currently dispatches to
pub fn current_implementation(instance: Address) -> ManagerResult<Address> {
    Ok(stable(instance)?.data.implementation)
}

pub fn allocations(instance: Address) -> ManagerResult<Vec<Allocation>> {
    Ok(stable(instance)?.data.allocations)
}

fn split_at(instance: Address, index: usize) -> ManagerResult<u16> {
    stable(instance)?
        .data
        .allocations
        .get(index)
        .map(|allocation| allocation.bps)
        .ok_or(ManagerError::NonExistentValue)
}

/// Basis points of the lending market leg
pub fn split_a(instance: Address) -> ManagerResult<u16> {
    split_at(instance, 0)
}

/// Basis points of the share vault leg
pub fn split_b(instance: Address) -> ManagerResult<u16> {
    split_at(instance, 1)
}

pub fn reward_tokens(instance: Address) -> ManagerResult<Vec<Address>> {
    Ok(stable(instance)?.data.reward_tokens.into_iter().collect())
}

pub fn idle_balance(instance: Address) -> ManagerResult<U256> {
    Ok(ExecutableStrategy::from(&stable(instance)?).idle_balance())
}

/// Base token value of every allocation, in allocation order
pub fn positions(instance: Address) -> ManagerResult<Vec<U256>> {
    ExecutableStrategy::from(&stable(instance)?).positions()
}

pub fn total_balance(instance: Address) -> ManagerResult<U256> {
    ExecutableStrategy::from(&stable(instance)?).total_balance()
}

pub fn query(instance: Address) -> ManagerResult<StrategyQuery> {
    let strategy = stable(instance)?;
    let executable = ExecutableStrategy::from(&strategy);
    StrategyQuery::new(
        &strategy,
        executable.idle_balance(),
        &executable.positions()?,
        executable.total_balance()?,
    )
}
