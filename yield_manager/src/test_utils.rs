//! Shared fixture for tests that need a complete deployment

use std::rc::Rc;

use alloy_primitives::{Address, U256};
use candid::Nat;

use crate::{
    api,
    code::ImplementationCode,
    constants::NEW_STRATEGY_TYPE,
    pricing::{MockPriceChecker, MockSwapRouter},
    types::{RegistryInitArgs, StrategyInput},
};

/// Base token liquidity the swap router starts with
pub const ROUTER_LIQUIDITY: u64 = 1_000_000;

/// A registry with one whitelisted implementation, an authorized factory,
/// both protocols and a price feed that doubles every swapped amount
pub struct World {
    pub deployer: Address,
    pub admin: Address,
    pub operator: Address,
    pub owner: Address,
    pub token: Address,
    pub reward: Address,
    pub registry: Address,
    pub factory: Address,
    pub implementation: Address,
    pub strategy_type: u64,
    pub lending: Address,
    pub vault: Address,
    pub price_checker: Address,
    pub swap_router: Address,
}

/// Price checker that accepts everything and expects twice the input
pub fn doubling_checker() -> MockPriceChecker {
    let mut checker = MockPriceChecker::new();
    checker
        .expect_get_expected_out()
        .returning(|amount_in, _, _| amount_in * U256::from(2));
    checker.expect_check_price().return_const(true);
    checker
}

/// Swap router that pays out twice the input
pub fn doubling_router() -> MockSwapRouter {
    let mut router = MockSwapRouter::new();
    router
        .expect_swap()
        .returning(|amount_in, _, _, _| Ok(amount_in * U256::from(2)));
    router
}

impl World {
    pub fn new() -> Self {
        Self::with_price_feed(doubling_checker(), doubling_router())
    }

    pub fn with_price_feed(checker: MockPriceChecker, router: MockSwapRouter) -> Self {
        let deployer = Address::repeat_byte(0xde);
        let admin = Address::repeat_byte(0xad);
        let operator = Address::repeat_byte(0x0b);
        let owner = Address::repeat_byte(0x01);
        let token = Address::repeat_byte(0xaa);
        let reward = Address::repeat_byte(0xcc);

        let registry = api::create_registry(
            deployer,
            RegistryInitArgs {
                admin: admin.to_string(),
                operator: operator.to_string(),
            },
        )
        .unwrap();
        let factory = api::create_factory(deployer, registry).unwrap();
        api::set_factory(admin, registry, factory, true).unwrap();

        let implementation =
            api::deploy_implementation(deployer, ImplementationCode::new("two-way split", 1));
        let strategy_type =
            api::whitelist_implementation(admin, registry, implementation, NEW_STRATEGY_TYPE)
                .unwrap();

        let lending = api::deploy_lending_market(deployer, token);
        let vault = api::deploy_share_vault(deployer, token);
        let price_checker = api::register_price_checker(deployer, Rc::new(checker));
        let swap_router = api::register_swap_router(deployer, Rc::new(router));
        api::mint_tokens(token, swap_router, U256::from(ROUTER_LIQUIDITY)).unwrap();
        api::mint_tokens(token, owner, U256::from(10_000)).unwrap();

        Self {
            deployer,
            admin,
            operator,
            owner,
            token,
            reward,
            registry,
            factory,
            implementation,
            strategy_type,
            lending,
            vault,
            price_checker,
            swap_router,
        }
    }

    /// Strategy input for `owner` with the given split
    pub fn input(&self, owner: Address, split_a: u16, split_b: u16) -> StrategyInput {
        StrategyInput {
            owner: owner.to_string(),
            registry: None,
            strategy_type: self.strategy_type,
            implementation: None,
            protocol_a: self.lending.to_string(),
            protocol_b: self.vault.to_string(),
            token: self.token.to_string(),
            split_a: Nat::from(u32::from(split_a)),
            split_b: Nat::from(u32::from(split_b)),
            price_checker: self.price_checker.to_string(),
            swap_router: self.swap_router.to_string(),
            slippage_bps: None,
            reward_tokens: vec![self.reward.to_string()],
        }
    }

    /// Same as `input`, with the registry and implementation filled in for direct initialization
    pub fn direct_input(&self, owner: Address, split_a: u16, split_b: u16) -> StrategyInput {
        StrategyInput {
            registry: Some(self.registry.to_string()),
            implementation: Some(self.implementation.to_string()),
            ..self.input(owner, split_a, split_b)
        }
    }

    /// Deploys and registers a strategy for `self.owner` through the factory
    pub fn strategy(&self, split_a: u16, split_b: u16) -> Address {
        api::deploy_strategy(self.owner, self.factory, self.input(self.owner, split_a, split_b))
            .unwrap()
    }

    /// Deploys and initializes a strategy without registering it
    pub fn unregistered_strategy(&self, owner: Address) -> Address {
        let instance = api::deploy_strategy_code(self.deployer);
        api::initialize_strategy(instance, self.direct_input(owner, 5_000, 5_000)).unwrap();
        instance
    }

    /// Deploys and whitelists a newer implementation of the fixture's strategy type
    pub fn new_version(&self, code: ImplementationCode) -> Address {
        let implementation = api::deploy_implementation(self.deployer, code);
        api::whitelist_implementation(self.admin, self.registry, implementation, self.strategy_type)
            .unwrap();
        implementation
    }
}
