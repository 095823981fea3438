//! Strategy factory
//!
//! A factory is bound to one registry. It deploys strategy instances at
//! addresses derived with CREATE2 semantics from the owner, initializes them
//! against the registry's latest implementation and registers them, all in
//! one step.

use alloy_primitives::{keccak256, Address};

use crate::{
    code::{deploy, deploy_at, ensure_code, Code},
    constants::STRATEGY_CODE_TAG,
    registry,
    state::FACTORY_STATE,
    strategy::run,
    types::StrategyInitArgs,
    utils::{common::ensure_not_null, error::*},
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FactoryData {
    /// Registry every deployed instance is bound to
    pub registry: Address,
}

fn factory_data(factory: Address) -> ManagerResult<FactoryData> {
    FACTORY_STATE
        .with(|factories| factories.borrow().get(&factory).cloned())
        .ok_or_else(|| {
            Violation::MissingCode {
                address: factory.to_string(),
                expected: "factory".to_string(),
            }
            .into()
        })
}

/// Deploys a factory bound to `registry`. The registry admin still has to authorize it.
pub fn create_factory(deployer: Address, registry: Address) -> ManagerResult<Address> {
    ensure_not_null(registry, "registry")?;
    ensure_code(registry, Code::Registry)?;

    let factory = deploy(deployer, Code::Factory);
    FACTORY_STATE.with(|factories| factories.borrow_mut().insert(factory, FactoryData { registry }));
    Ok(factory)
}

/// Registry the factory deploys for
pub fn registry_of(factory: Address) -> ManagerResult<Address> {
    Ok(factory_data(factory)?.registry)
}

/// Deterministic address of the instance `factory` deploys for `owner`
pub fn compute_address(factory: Address, owner: Address) -> ManagerResult<Address> {
    factory_data(factory)?;
    Ok(factory.create2(keccak256(owner), keccak256(STRATEGY_CODE_TAG)))
}

/// Deploys, initializes and registers a strategy instance for `args.owner`.
///
/// `args.registry` and `args.implementation` are overwritten with the
/// factory's registry and the latest implementation of `args.strategy_type`.
/// Callable by the owner or by the registry's operator.
pub fn deploy_strategy(
    caller: Address,
    factory: Address,
    mut args: StrategyInitArgs,
) -> ManagerResult<Address> {
    let registry = registry_of(factory)?;
    ensure_not_null(args.owner, "owner")?;
    if caller != args.owner && caller != registry::operator(registry)? {
        return Err(ManagerError::Unauthorized(Role::OwnerOrOperator));
    }

    let instance = compute_address(factory, args.owner)?;
    deploy_at(instance, Code::Strategy)?;

    let owner = args.owner;
    args.registry = registry;
    args.implementation = registry::latest_implementation(registry, args.strategy_type)?;
    run::initialize(instance, args)?;

    registry::add_strategy(factory, registry, owner, instance)?;
    Ok(instance)
}
