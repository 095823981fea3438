//! Registry operations
//!
//! The registry is the only authority on which implementations may run for a
//! strategy type, which user owns which instance, and when an instance may be
//! upgraded. Every failed precondition rejects the whole operation.
//!
//! ```plain
//! Implementation lifecycle:
//!
//!   [unregistered] ── whitelist ──► [latest for type]
//!                                          │
//!                          whitelist of a newer implementation
//!                                          ▼
//!                              [whitelisted, not latest]
//! ```

use alloy_primitives::Address;

use crate::{
    code::{deploy, implementation_code, Code},
    constants::NEW_STRATEGY_TYPE,
    state::REGISTRY_STATE,
    strategy::run,
    types::RegistryConfig,
    utils::{common::ensure_not_null, error::*},
};

use super::{data::RegistryData, implementation::ImplementationRecord};

/// Returns a copy of the state of the registry at `registry`
fn registry_data(registry: Address) -> ManagerResult<RegistryData> {
    REGISTRY_STATE
        .with(|registries| registries.borrow().get(&registry).cloned())
        .ok_or_else(|| {
            Violation::MissingCode {
                address: registry.to_string(),
                expected: "registry".to_string(),
            }
            .into()
        })
}

/// Runs `f` against the mutable state of the registry at `registry`
fn with_registry_mut<T, F>(registry: Address, f: F) -> ManagerResult<T>
where
    F: FnOnce(&mut RegistryData) -> ManagerResult<T>,
{
    REGISTRY_STATE.with(|registries| {
        let mut binding = registries.borrow_mut();
        let data = binding.get_mut(&registry).ok_or_else(|| {
            ManagerError::from(Violation::MissingCode {
                address: registry.to_string(),
                expected: "registry".to_string(),
            })
        })?;
        f(data)
    })
}

fn only_admin(caller: Address, data: &RegistryData) -> ManagerResult<()> {
    if caller != data.admin {
        return Err(ManagerError::Unauthorized(Role::Admin));
    }
    Ok(())
}

/// Deploys a registry and returns its address
pub fn create_registry(deployer: Address, config: RegistryConfig) -> ManagerResult<Address> {
    ensure_not_null(config.admin, "admin")?;
    ensure_not_null(config.operator, "operator")?;

    let registry = deploy(deployer, Code::Registry);
    REGISTRY_STATE.with(|registries| {
        registries
            .borrow_mut()
            .insert(registry, RegistryData::from(config))
    });
    Ok(registry)
}

/// Whitelists `implementation` for `strategy_type` and makes it the latest of that type.
/// `NEW_STRATEGY_TYPE` allocates a new type id. Returns the type id.
pub fn whitelist_implementation(
    caller: Address,
    registry: Address,
    implementation: Address,
    strategy_type: u64,
) -> ManagerResult<u64> {
    ensure_not_null(implementation, "implementation")?;
    implementation_code(implementation)?;

    with_registry_mut(registry, |data| {
        only_admin(caller, data)?;
        if data.implementations.contains_key(&implementation) {
            return Err(Violation::AlreadyWhitelisted.into());
        }

        let strategy_type = if strategy_type == NEW_STRATEGY_TYPE {
            let assigned = data.next_type_id;
            data.next_type_id = assigned
                .checked_add(1)
                .ok_or_else(|| arithmetic_err("Strategy type ids are exhausted."))?;
            assigned
        } else if data.latest.contains_key(&strategy_type) {
            strategy_type
        } else {
            return Err(Violation::UnknownStrategyType(strategy_type).into());
        };

        data.implementations.insert(
            implementation,
            ImplementationRecord::new(implementation, strategy_type),
        );
        data.latest.insert(strategy_type, implementation);
        Ok(strategy_type)
    })
}

/// Registers `instance` as owned by `user`
pub fn add_strategy(
    caller: Address,
    registry: Address,
    user: Address,
    instance: Address,
) -> ManagerResult<()> {
    ensure_not_null(user, "user")?;
    ensure_not_null(instance, "instance")?;

    let data = registry_data(registry)?;
    if !data.is_privileged(caller) {
        return Err(ManagerError::Unauthorized(Role::Factory));
    }
    if data.ownership.owner_of(instance).is_some() {
        return Err(Violation::AlreadyRegistered.into());
    }

    // Self-reported by the instance
    if run::owner(instance)? != user {
        return Err(Violation::OwnerMismatch.into());
    }
    if run::registry_ref(instance)? != registry {
        return Err(Violation::ForeignRegistry.into());
    }
    let implementation = run::current_implementation(instance)?;
    let record = data
        .implementations
        .get(&implementation)
        .filter(|record| record.whitelisted)
        .ok_or(Violation::NotWhitelisted)?;
    if !data.is_latest(implementation) {
        return Err(Violation::NotLatestImplementation.into());
    }
    let strategy_type = run::strategy_type(instance)?;
    if strategy_type != record.strategy_type {
        return Err(Violation::TypeMismatch {
            expected: record.strategy_type,
            found: strategy_type,
        }
        .into());
    }

    with_registry_mut(registry, |data| {
        data.ownership.add(user, instance);
        Ok(())
    })
}

/// Moves `instance` to `new_implementation`. Only the registered owner may upgrade.
pub fn upgrade_strategy(
    caller: Address,
    registry: Address,
    instance: Address,
    new_implementation: Address,
) -> ManagerResult<()> {
    let data = registry_data(registry)?;
    if !data.ownership.contains(caller, instance) {
        return Err(ManagerError::Unauthorized(Role::Owner));
    }
    if !data.is_whitelisted(new_implementation) {
        return Err(Violation::NotWhitelisted.into());
    }

    let current = run::current_implementation(instance)?;
    let strategy_type = data
        .implementations
        .get(&current)
        .map(|record| record.strategy_type)
        .ok_or(Violation::NotWhitelisted)?;
    if data.latest.get(&strategy_type) != Some(&new_implementation) {
        return Err(Violation::NotLatestImplementation.into());
    }
    if current == new_implementation {
        return Err(Violation::SameImplementation.into());
    }

    run::upgrade_to(registry, instance, new_implementation)
}

/// Moves the calling instance to `new_owner` in the ownership record.
/// The caller must be a registered instance reporting `new_owner` as its owner.
pub fn update_strategy_owner(
    caller: Address,
    registry: Address,
    new_owner: Address,
) -> ManagerResult<()> {
    let data = registry_data(registry)?;
    if data.ownership.owner_of(caller).is_none() {
        return Err(ManagerError::Unauthorized(Role::RegisteredStrategy));
    }
    ensure_not_null(new_owner, "new_owner")?;
    if run::owner(caller)? != new_owner {
        return Err(Violation::OwnerMismatch.into());
    }

    with_registry_mut(registry, |data| {
        data.ownership
            .transfer(caller, new_owner)
            .map(|_| ())
            .ok_or(ManagerError::NonExistentValue)
    })
}

/// Replaces the designated operator
pub fn set_operator(caller: Address, registry: Address, operator: Address) -> ManagerResult<()> {
    ensure_not_null(operator, "operator")?;
    with_registry_mut(registry, |data| {
        only_admin(caller, data)?;
        data.operator(operator);
        Ok(())
    })
}

/// Authorizes or deauthorizes `factory` to register strategies
pub fn set_factory(
    caller: Address,
    registry: Address,
    factory: Address,
    enabled: bool,
) -> ManagerResult<()> {
    ensure_not_null(factory, "factory")?;
    with_registry_mut(registry, |data| {
        only_admin(caller, data)?;
        if enabled {
            data.factories.insert(factory);
        } else {
            data.factories.remove(&factory);
        }
        Ok(())
    })
}

pub fn transfer_admin(caller: Address, registry: Address, new_admin: Address) -> ManagerResult<()> {
    ensure_not_null(new_admin, "new_admin")?;
    with_registry_mut(registry, |data| {
        only_admin(caller, data)?;
        data.admin(new_admin);
        Ok(())
    })
}

pub fn is_user_strategy(registry: Address, user: Address, instance: Address) -> ManagerResult<bool> {
    Ok(registry_data(registry)?.ownership.contains(user, instance))
}

pub fn user_strategies(registry: Address, user: Address) -> ManagerResult<Vec<Address>> {
    Ok(registry_data(registry)?.ownership.strategies_of(user))
}

pub fn strategy_owner(registry: Address, instance: Address) -> ManagerResult<Option<Address>> {
    Ok(registry_data(registry)?.ownership.owner_of(instance))
}

pub fn is_whitelisted(registry: Address, implementation: Address) -> ManagerResult<bool> {
    Ok(registry_data(registry)?.is_whitelisted(implementation))
}

pub fn implementation_record(
    registry: Address,
    implementation: Address,
) -> ManagerResult<Option<ImplementationRecord>> {
    Ok(registry_data(registry)?
        .implementations
        .get(&implementation)
        .copied())
}

/// Returns `true` if `implementation` is the latest of its strategy type
pub fn is_latest(registry: Address, implementation: Address) -> ManagerResult<bool> {
    Ok(registry_data(registry)?.is_latest(implementation))
}

pub fn latest_implementation(registry: Address, strategy_type: u64) -> ManagerResult<Address> {
    registry_data(registry)?
        .latest
        .get(&strategy_type)
        .copied()
        .ok_or_else(|| Violation::UnknownStrategyType(strategy_type).into())
}

/// The designated operator of the registry
pub fn operator(registry: Address) -> ManagerResult<Address> {
    Ok(registry_data(registry)?.operator)
}

pub fn admin(registry: Address) -> ManagerResult<Address> {
    Ok(registry_data(registry)?.admin)
}
