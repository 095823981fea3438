//! Simulated lending market (ProtocolA)
//!
//! Share based money market in the style of a cToken: depositors receive
//! market shares at the current exchange rate and mutating calls report
//! failure through a non-zero status code instead of reverting.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use alloy_sol_types::{SolCall, SolInterface};

use crate::{
    code::{deploy, Code},
    constants::*,
    ledger,
    state::LENDING_MARKETS,
    types::ICToken::{self, ICTokenCalls},
    utils::error::*,
};

#[derive(Clone, Debug)]
pub struct LendingMarket {
    /// Token supplied to and redeemed from the market
    pub underlying: Address,
    /// Underlying per share, scaled by `EXCHANGE_RATE_SCALE`
    pub exchange_rate: U256,
    pub shares: HashMap<Address, U256>,
    pub total_shares: U256,
    /// When set, every mutating call returns this status code
    pub failure_code: Option<u64>,
}

impl LendingMarket {
    pub fn new(underlying: Address) -> Self {
        Self {
            underlying,
            exchange_rate: exchange_rate_scale(),
            shares: HashMap::new(),
            total_shares: U256::ZERO,
            failure_code: None,
        }
    }

    fn shares_of(&self, holder: Address) -> U256 {
        self.shares.get(&holder).copied().unwrap_or_default()
    }

    fn to_underlying(&self, shares: U256) -> ManagerResult<U256> {
        shares
            .checked_mul(self.exchange_rate)
            .map(|scaled| scaled / exchange_rate_scale())
            .ok_or_else(|| arithmetic_err("Lending market share conversion overflowed."))
    }

    fn burn(&mut self, holder: Address, shares: U256) {
        let balance = self.shares_of(holder);
        self.shares.insert(holder, balance - shares);
        self.total_shares -= shares;
    }

    fn mint(&mut self, market: Address, minter: Address, amount: U256) -> u64 {
        if let Some(code) = self.failure_code {
            return code;
        }

        let shares = match amount.checked_mul(exchange_rate_scale()) {
            Some(scaled) => scaled / self.exchange_rate,
            None => return LENDING_MATH_ERROR,
        };
        // Amounts worth less than one share are refused, not absorbed
        if shares.is_zero() {
            return LENDING_MATH_ERROR;
        }
        if ledger::transfer(self.underlying, minter, market, amount).is_err() {
            return LENDING_TRANSFER_FAILED;
        }

        *self.shares.entry(minter).or_default() += shares;
        self.total_shares += shares;
        LENDING_NO_ERROR
    }

    fn redeem(&mut self, market: Address, redeemer: Address, shares: U256) -> u64 {
        if let Some(code) = self.failure_code {
            return code;
        }
        if shares > self.shares_of(redeemer) {
            return LENDING_INSUFFICIENT_SHARES;
        }

        let amount = match self.to_underlying(shares) {
            Ok(amount) => amount,
            Err(_) => return LENDING_MATH_ERROR,
        };
        if ledger::transfer(self.underlying, market, redeemer, amount).is_err() {
            return LENDING_TRANSFER_FAILED;
        }

        self.burn(redeemer, shares);
        LENDING_NO_ERROR
    }

    fn redeem_underlying(&mut self, market: Address, redeemer: Address, amount: U256) -> u64 {
        if let Some(code) = self.failure_code {
            return code;
        }

        // Shares are rounded up so the market never pays out more than it burns
        let shares = match amount
            .checked_mul(exchange_rate_scale())
            .and_then(|scaled| scaled.checked_add(self.exchange_rate - U256::from(1)))
        {
            Some(scaled) => scaled / self.exchange_rate,
            None => return LENDING_MATH_ERROR,
        };
        if shares > self.shares_of(redeemer) {
            return LENDING_INSUFFICIENT_SHARES;
        }
        if ledger::transfer(self.underlying, market, redeemer, amount).is_err() {
            return LENDING_TRANSFER_FAILED;
        }

        self.burn(redeemer, shares);
        LENDING_NO_ERROR
    }
}

/// Handles calldata sent to the lending market at `target`
pub(super) fn dispatch(caller: Address, target: Address, data: &[u8]) -> ManagerResult<Vec<u8>> {
    let decoded = ICTokenCalls::abi_decode(data, true)
        .map_err(|err| protocol_failure(target, format!("lending market rejected call: {}", err)))?;

    LENDING_MARKETS.with(|markets| {
        let mut binding = markets.borrow_mut();
        let market = binding
            .get_mut(&target)
            .ok_or_else(|| protocol_failure(target, "lending market has no state"))?;

        let response = match decoded {
            ICTokenCalls::mint(call) => {
                let status = market.mint(target, caller, call.mintAmount);
                ICToken::mintCall::abi_encode_returns(&(U256::from(status),))
            }
            ICTokenCalls::redeem(call) => {
                let status = market.redeem(target, caller, call.redeemTokens);
                ICToken::redeemCall::abi_encode_returns(&(U256::from(status),))
            }
            ICTokenCalls::redeemUnderlying(call) => {
                let status = market.redeem_underlying(target, caller, call.redeemAmount);
                ICToken::redeemUnderlyingCall::abi_encode_returns(&(U256::from(status),))
            }
            ICTokenCalls::balanceOfUnderlying(call) => {
                let amount = market.to_underlying(market.shares_of(call.owner))?;
                ICToken::balanceOfUnderlyingCall::abi_encode_returns(&(amount,))
            }
            ICTokenCalls::balanceOf(call) => {
                ICToken::balanceOfCall::abi_encode_returns(&(market.shares_of(call.owner),))
            }
            ICTokenCalls::underlying(_) => {
                ICToken::underlyingCall::abi_encode_returns(&(market.underlying,))
            }
        };

        Ok(response)
    })
}

/// Deploys a lending market for `underlying` and returns its address
pub fn deploy_lending_market(deployer: Address, underlying: Address) -> Address {
    let address = deploy(deployer, Code::LendingMarket);
    LENDING_MARKETS.with(|markets| {
        markets
            .borrow_mut()
            .insert(address, LendingMarket::new(underlying))
    });
    address
}

/// Makes every mutating call of the market return `code`. `None` restores normal operation.
pub fn set_failure_code(market: Address, code: Option<u64>) -> ManagerResult<()> {
    LENDING_MARKETS.with(|markets| {
        let mut binding = markets.borrow_mut();
        let state = binding
            .get_mut(&market)
            .ok_or(ManagerError::NonExistentValue)?;
        state.failure_code = code;
        Ok(())
    })
}

/// Raises the exchange rate of the market and funds the interest owed to share holders
pub fn accrue_interest(market: Address, exchange_rate: U256) -> ManagerResult<()> {
    let (underlying, owed) = LENDING_MARKETS.with(|markets| {
        let mut binding = markets.borrow_mut();
        let state = binding
            .get_mut(&market)
            .ok_or(ManagerError::NonExistentValue)?;
        if exchange_rate < state.exchange_rate {
            return Err(ManagerError::Custom(
                "The exchange rate of a lending market cannot decrease.".to_string(),
            ));
        }

        let before = state.to_underlying(state.total_shares)?;
        state.exchange_rate = exchange_rate;
        let after = state.to_underlying(state.total_shares)?;
        Ok((state.underlying, after - before))
    })?;

    ledger::mint(underlying, market, owed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::call_typed;

    fn setup() -> (Address, Address, Address) {
        let token = Address::repeat_byte(0xaa);
        let user = Address::repeat_byte(0x01);
        let market = deploy_lending_market(Address::repeat_byte(0xde), token);
        ledger::mint(token, user, U256::from(1_000)).unwrap();
        (token, user, market)
    }

    fn status(call: ManagerResult<ICToken::mintReturn>) -> U256 {
        call.unwrap()._0
    }

    #[test]
    fn test_mint_and_redeem() {
        let (token, user, market) = setup();

        let minted = call_typed(user, market, &ICToken::mintCall { mintAmount: U256::from(600) });
        assert_eq!(status(minted), U256::ZERO);
        assert_eq!(ledger::balance_of(token, market), U256::from(600));

        let position = call_typed(
            user,
            market,
            &ICToken::balanceOfUnderlyingCall { owner: user },
        )
        .unwrap()
        ._0;
        assert_eq!(position, U256::from(600));

        let shares = call_typed(user, market, &ICToken::balanceOfCall { owner: user })
            .unwrap()
            ._0;
        let redeemed = call_typed(user, market, &ICToken::redeemCall { redeemTokens: shares })
            .unwrap()
            ._0;
        assert_eq!(redeemed, U256::ZERO);
        assert_eq!(ledger::balance_of(token, user), U256::from(1_000));
    }

    #[test]
    fn test_failure_code_is_returned_without_moving_funds() {
        let (token, user, market) = setup();
        set_failure_code(market, Some(3)).unwrap();

        let minted = call_typed(user, market, &ICToken::mintCall { mintAmount: U256::from(100) });

        assert_eq!(status(minted), U256::from(3));
        assert_eq!(ledger::balance_of(token, user), U256::from(1_000));
    }

    #[test]
    fn test_mint_without_funds_reports_transfer_failure() {
        let (_, _, market) = setup();
        let broke = Address::repeat_byte(0x02);

        let minted = call_typed(broke, market, &ICToken::mintCall { mintAmount: U256::from(1) });

        assert_eq!(status(minted), U256::from(LENDING_TRANSFER_FAILED));
    }

    #[test]
    fn test_redeem_underlying_after_interest() {
        let (token, user, market) = setup();
        call_typed(user, market, &ICToken::mintCall { mintAmount: U256::from(1_000) }).unwrap();

        // 10% interest
        accrue_interest(market, exchange_rate_scale() * U256::from(11) / U256::from(10)).unwrap();
        let position = call_typed(
            user,
            market,
            &ICToken::balanceOfUnderlyingCall { owner: user },
        )
        .unwrap()
        ._0;
        assert_eq!(position, U256::from(1_100));

        let redeemed = call_typed(
            user,
            market,
            &ICToken::redeemUnderlyingCall {
                redeemAmount: U256::from(550),
            },
        )
        .unwrap()
        ._0;
        assert_eq!(redeemed, U256::ZERO);
        assert_eq!(ledger::balance_of(token, user), U256::from(550));

        let excessive = call_typed(
            user,
            market,
            &ICToken::redeemUnderlyingCall {
                redeemAmount: U256::from(551),
            },
        )
        .unwrap()
        ._0;
        assert_eq!(excessive, U256::from(LENDING_INSUFFICIENT_SHARES));
    }

    #[test]
    fn test_mint_below_one_share_is_refused() {
        let (token, user, market) = setup();
        accrue_interest(market, exchange_rate_scale() * U256::from(11) / U256::from(10)).unwrap();

        let minted = call_typed(user, market, &ICToken::mintCall { mintAmount: U256::from(1) });

        assert_eq!(status(minted), U256::from(LENDING_MATH_ERROR));
        assert_eq!(ledger::balance_of(token, user), U256::from(1_000));
        assert_eq!(ledger::balance_of(token, market), U256::ZERO);
    }

    #[test]
    fn test_underlying_is_reported() {
        let (token, user, market) = setup();
        let underlying = call_typed(user, market, &ICToken::underlyingCall {})
            .unwrap()
            ._0;
        assert_eq!(underlying, token);
    }
}
