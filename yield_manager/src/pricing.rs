//! Reward swaps gated by a price checker
//!
//! Both the swap facility and the price checker are external collaborators.
//! Hosts register an implementation of each trait at an address and strategy
//! instances refer to them by that address.

use std::rc::Rc;

use alloy_primitives::{Address, U256};

use crate::{
    code::{deploy, Code},
    constants::BPS_DENOMINATOR,
    ledger,
    state::{PRICE_CHECKERS, SWAP_ROUTERS},
    strategy::allocation::bps_of,
    utils::error::*,
};

/// Accept/reject gate for swap outputs
#[cfg_attr(test, mockall::automock)]
pub trait PriceChecker {
    /// Returns `true` if receiving `min_out` of `to_token` for `amount_in` of `from_token`
    /// is acceptable within `slippage_bps`
    fn check_price(
        &self,
        amount_in: U256,
        from_token: Address,
        to_token: Address,
        min_out: U256,
        slippage_bps: u16,
    ) -> bool;

    /// Oracle estimate of the `to_token` received for `amount_in` of `from_token`
    fn get_expected_out(&self, amount_in: U256, from_token: Address, to_token: Address) -> U256;
}

/// Swap facility. The router receives `amount_in` before `swap` is called and
/// must hold the output it reports, which is then paid out of its balance.
#[cfg_attr(test, mockall::automock)]
pub trait SwapRouter {
    /// Executes the swap and returns the amount of `to_token` owed to the caller
    fn swap(
        &self,
        amount_in: U256,
        from_token: Address,
        to_token: Address,
        min_out: U256,
    ) -> ManagerResult<U256>;
}

/// Registers a price checker and returns the address it is reachable at
pub fn register_price_checker(deployer: Address, checker: Rc<dyn PriceChecker>) -> Address {
    let address = deploy(deployer, Code::PriceChecker);
    PRICE_CHECKERS.with(|checkers| checkers.borrow_mut().insert(address, checker));
    address
}

/// Registers a swap router and returns the address it is reachable at
pub fn register_swap_router(deployer: Address, router: Rc<dyn SwapRouter>) -> Address {
    let address = deploy(deployer, Code::SwapRouter);
    SWAP_ROUTERS.with(|routers| routers.borrow_mut().insert(address, router));
    address
}

fn price_checker(address: Address) -> ManagerResult<Rc<dyn PriceChecker>> {
    PRICE_CHECKERS
        .with(|checkers| checkers.borrow().get(&address).cloned())
        .ok_or_else(|| protocol_failure(address, "no price checker at address"))
}

fn swap_router(address: Address) -> ManagerResult<Rc<dyn SwapRouter>> {
    SWAP_ROUTERS
        .with(|routers| routers.borrow().get(&address).cloned())
        .ok_or_else(|| protocol_failure(address, "no swap router at address"))
}

/// Addresses and limits of one gated swap
#[derive(Clone, Copy, Debug)]
pub struct SwapRoute {
    pub holder: Address,
    pub router: Address,
    pub price_checker: Address,
    pub slippage_bps: u16,
}

/// Swaps `amount_in` of `from_token` held by `route.holder` into `to_token`.
///
/// The minimum output is derived from the price checker's expected output and
/// the slippage tolerance. The swap is rejected with `SlippageExceeded` if the
/// checker refuses that minimum or if the router delivers less than it.
pub fn gated_swap(
    route: SwapRoute,
    from_token: Address,
    to_token: Address,
    amount_in: U256,
) -> ManagerResult<U256> {
    let checker = price_checker(route.price_checker)?;
    let router = swap_router(route.router)?;

    let expected_out = checker.get_expected_out(amount_in, from_token, to_token);
    let min_out = bps_of(
        expected_out,
        BPS_DENOMINATOR.saturating_sub(route.slippage_bps),
    )?;
    let slippage = |amount_out: U256| ManagerError::SlippageExceeded {
        token: from_token.to_string(),
        amount_out: amount_out.to_string(),
        min_out: min_out.to_string(),
    };

    if !checker.check_price(amount_in, from_token, to_token, min_out, route.slippage_bps) {
        return Err(slippage(expected_out));
    }

    ledger::transfer(from_token, route.holder, route.router, amount_in)?;
    let amount_out = router.swap(amount_in, from_token, to_token, min_out)?;
    if amount_out < min_out {
        return Err(slippage(amount_out));
    }

    ledger::transfer(to_token, route.router, route.holder, amount_out).map_err(|err| {
        protocol_failure(
            route.router,
            format!("router could not pay out the swap: {:?}", err),
        )
    })?;

    Ok(amount_out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn reward() -> Address {
        Address::repeat_byte(0xcc)
    }

    fn base() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn holder() -> Address {
        Address::repeat_byte(0x01)
    }

    fn route(checker: MockPriceChecker, router: MockSwapRouter) -> SwapRoute {
        let deployer = Address::repeat_byte(0xde);
        let price_checker = register_price_checker(deployer, Rc::new(checker));
        let router = register_swap_router(deployer, Rc::new(router));
        ledger::mint(reward(), holder(), U256::from(100)).unwrap();
        ledger::mint(base(), router, U256::from(1_000)).unwrap();
        SwapRoute {
            holder: holder(),
            router,
            price_checker,
            slippage_bps: 100,
        }
    }

    #[test]
    fn test_gated_swap_pays_out() {
        let mut checker = MockPriceChecker::new();
        checker
            .expect_get_expected_out()
            .returning(|amount, _, _| amount * U256::from(2));
        checker
            .expect_check_price()
            .with(eq(U256::from(100)), eq(reward()), eq(base()), eq(U256::from(198)), eq(100))
            .return_const(true);
        let mut router = MockSwapRouter::new();
        router.expect_swap().returning(|_, _, _, _| Ok(U256::from(199)));

        let route = route(checker, router);
        let out = gated_swap(route, reward(), base(), U256::from(100)).unwrap();

        assert_eq!(out, U256::from(199));
        assert_eq!(ledger::balance_of(base(), holder()), U256::from(199));
        assert_eq!(ledger::balance_of(reward(), holder()), U256::ZERO);
        assert_eq!(ledger::balance_of(reward(), route.router), U256::from(100));
    }

    #[test]
    fn test_rejected_price_fails_before_swapping() {
        let mut checker = MockPriceChecker::new();
        checker.expect_get_expected_out().return_const(U256::from(200));
        checker.expect_check_price().return_const(false);
        let mut router = MockSwapRouter::new();
        router.expect_swap().never();

        let route = route(checker, router);
        let result = gated_swap(route, reward(), base(), U256::from(100));

        assert!(matches!(result, Err(ManagerError::SlippageExceeded { .. })));
        assert_eq!(ledger::balance_of(reward(), holder()), U256::from(100));
    }

    #[test]
    fn test_short_output_is_rejected() {
        let mut checker = MockPriceChecker::new();
        checker.expect_get_expected_out().return_const(U256::from(200));
        checker.expect_check_price().return_const(true);
        let mut router = MockSwapRouter::new();
        router.expect_swap().returning(|_, _, _, _| Ok(U256::from(150)));

        let route = route(checker, router);
        let result = gated_swap(route, reward(), base(), U256::from(100));

        assert_eq!(
            result,
            Err(ManagerError::SlippageExceeded {
                token: reward().to_string(),
                amount_out: "150".to_string(),
                min_out: "198".to_string(),
            })
        );
    }

    #[test]
    fn test_unknown_router_is_a_protocol_failure() {
        let mut checker = MockPriceChecker::new();
        checker.expect_get_expected_out().return_const(U256::from(200));
        let price_checker = register_price_checker(Address::repeat_byte(0xde), Rc::new(checker));
        let route = SwapRoute {
            holder: holder(),
            router: Address::repeat_byte(0x77),
            price_checker,
            slippage_bps: 0,
        };

        assert!(matches!(
            gated_swap(route, reward(), base(), U256::from(1)),
            Err(ManagerError::ExternalProtocolFailure { .. })
        ));
    }
}
