use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;
use candid::{CandidType, Nat};
use serde::Deserialize;

use crate::{
    constants::DEFAULT_SLIPPAGE_BPS,
    registry::implementation::ImplementationRecord,
    strategy::{allocation::ProtocolRef, stable::StableStrategy},
    utils::{
        common::{nat_to_bps, string_to_address, u256_to_nat},
        error::{ManagerError, ManagerResult},
    },
};

/// Registry initialization input
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct RegistryInitArgs {
    pub admin: String,
    pub operator: String,
}

/// Typed registry configuration
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RegistryConfig {
    /// Privileged caller: whitelists implementations, registers strategies, manages roles
    pub admin: Address,
    /// Designated operational role allowed to rebalance
    pub operator: Address,
}

impl TryFrom<RegistryInitArgs> for RegistryConfig {
    type Error = ManagerError;

    fn try_from(value: RegistryInitArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            admin: string_to_address(value.admin)?,
            operator: string_to_address(value.operator)?,
        })
    }
}

/// Strategy initialization input.
/// `registry` and `implementation` may be left out when deploying through a factory.
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct StrategyInput {
    pub owner: String,
    pub registry: Option<String>,
    pub strategy_type: u64,
    pub implementation: Option<String>,
    pub protocol_a: String,
    pub protocol_b: String,
    pub token: String,
    pub split_a: Nat,
    pub split_b: Nat,
    pub price_checker: String,
    pub swap_router: String,
    pub slippage_bps: Option<Nat>,
    pub reward_tokens: Vec<String>,
}

/// Typed arguments of a strategy instance's one-time initialization
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StrategyInitArgs {
    pub owner: Address,
    pub registry: Address,
    pub strategy_type: u64,
    pub implementation: Address,
    /// Lending market receiving `split_a`
    pub protocol_a: Address,
    /// Share vault receiving `split_b`
    pub protocol_b: Address,
    /// Base token
    pub token: Address,
    pub split_a: u16,
    pub split_b: u16,
    pub price_checker: Address,
    pub swap_router: Address,
    pub slippage_bps: u16,
    pub reward_tokens: Vec<Address>,
}

impl TryFrom<StrategyInput> for StrategyInitArgs {
    type Error = ManagerError;

    fn try_from(value: StrategyInput) -> Result<Self, Self::Error> {
        let optional_address = |input: Option<String>| -> Result<Address, ManagerError> {
            input.map_or(Ok(Address::ZERO), string_to_address)
        };

        let reward_tokens: Vec<Address> = value
            .reward_tokens
            .into_iter()
            .map(string_to_address)
            .collect::<Result<Vec<_>, _>>()?;

        let slippage_bps = match value.slippage_bps {
            Some(slippage) => nat_to_bps(&slippage)?,
            None => DEFAULT_SLIPPAGE_BPS,
        };

        Ok(Self {
            owner: string_to_address(value.owner)?,
            registry: optional_address(value.registry)?,
            strategy_type: value.strategy_type,
            implementation: optional_address(value.implementation)?,
            protocol_a: string_to_address(value.protocol_a)?,
            protocol_b: string_to_address(value.protocol_b)?,
            token: string_to_address(value.token)?,
            split_a: nat_to_bps(&value.split_a)?,
            split_b: nat_to_bps(&value.split_b)?,
            price_checker: string_to_address(value.price_checker)?,
            swap_router: string_to_address(value.swap_router)?,
            slippage_bps,
            reward_tokens,
        })
    }
}

/// One allocation entry of a strategy
#[derive(CandidType, Deserialize, Clone, Debug, PartialEq)]
pub struct AllocationQuery {
    pub protocol: String,
    pub kind: String,
    pub bps: u16,
}

/// Read-only view of a strategy instance
#[derive(CandidType, Deserialize, Clone, Debug, PartialEq)]
pub struct StrategyQuery {
    pub address: String,
    pub owner: String,
    pub registry: String,
    pub strategy_type: u64,
    pub implementation: String,
    pub token: String,
    pub allocations: Vec<AllocationQuery>,
    pub reward_tokens: Vec<String>,
    pub is_locked: bool,
    /// Base token held by the instance outside the protocols
    pub idle_balance: Nat,
    /// Base token value of every allocation, in allocation order
    pub positions: Vec<Nat>,
    pub total_balance: Nat,
}

impl StrategyQuery {
    /// Builds the view of `value` with the balances read from the protocols
    pub fn new(
        value: &StableStrategy,
        idle_balance: U256,
        positions: &[U256],
        total_balance: U256,
    ) -> ManagerResult<Self> {
        Ok(Self {
            address: value.settings.address.to_string(),
            owner: value.data.owner.to_string(),
            registry: value.settings.registry.to_string(),
            strategy_type: value.settings.strategy_type,
            implementation: value.data.implementation.to_string(),
            token: value.settings.token.to_string(),
            allocations: value
                .data
                .allocations
                .iter()
                .map(|allocation| AllocationQuery {
                    protocol: allocation.protocol.address().to_string(),
                    kind: match allocation.protocol {
                        ProtocolRef::Lending(_) => "lending".to_string(),
                        ProtocolRef::Vault(_) => "vault".to_string(),
                    },
                    bps: allocation.bps,
                })
                .collect(),
            reward_tokens: value
                .data
                .reward_tokens
                .iter()
                .map(|token| token.to_string())
                .collect(),
            is_locked: value.lock.is_locked,
            idle_balance: u256_to_nat(&idle_balance)?,
            positions: positions
                .iter()
                .map(u256_to_nat)
                .collect::<ManagerResult<Vec<_>>>()?,
            total_balance: u256_to_nat(&total_balance)?,
        })
    }
}

/// Read-only view of an implementation record
#[derive(CandidType, Deserialize, Clone, Debug, PartialEq)]
pub struct ImplementationQuery {
    pub implementation: String,
    pub strategy_type: u64,
    pub whitelisted: bool,
    pub latest: bool,
}

impl ImplementationQuery {
    pub fn new(record: &ImplementationRecord, latest: bool) -> Self {
        Self {
            implementation: record.implementation.to_string(),
            strategy_type: record.strategy_type,
            whitelisted: record.whitelisted,
            latest,
        }
    }
}

sol!(
    // Lending market (ProtocolA). Status code 0 is success.
    #[derive(Debug)]
    interface ICToken {
        function mint(uint256 mintAmount) external returns (uint256);
        function redeem(uint256 redeemTokens) external returns (uint256);
        function redeemUnderlying(uint256 redeemAmount) external returns (uint256);
        function balanceOfUnderlying(address owner) external returns (uint256);
        function balanceOf(address owner) external view returns (uint256);
        function underlying() external view returns (address);
    }
);

sol!(
    // Share vault (ProtocolB)
    #[derive(Debug)]
    interface IERC4626 {
        function deposit(uint256 assets, address receiver) external returns (uint256 shares);
        function redeem(uint256 shares, address receiver, address owner) external returns (uint256 assets);
        function withdraw(uint256 assets, address receiver, address owner) external returns (uint256 shares);
        function balanceOf(address owner) external view returns (uint256);
        function convertToAssets(uint256 shares) external view returns (uint256 assets);
        function asset() external view returns (address);
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> StrategyInput {
        StrategyInput {
            owner: "0x1111111111111111111111111111111111111111".to_string(),
            registry: None,
            strategy_type: 1,
            implementation: None,
            protocol_a: "0x2222222222222222222222222222222222222222".to_string(),
            protocol_b: "0x3333333333333333333333333333333333333333".to_string(),
            token: "0x4444444444444444444444444444444444444444".to_string(),
            split_a: Nat::from(6_000u32),
            split_b: Nat::from(4_000u32),
            price_checker: "0x5555555555555555555555555555555555555555".to_string(),
            swap_router: "0x6666666666666666666666666666666666666666".to_string(),
            slippage_bps: None,
            reward_tokens: vec!["0x7777777777777777777777777777777777777777".to_string()],
        }
    }

    #[test]
    fn test_strategy_input_conversion() {
        let args = StrategyInitArgs::try_from(input()).unwrap();

        assert_eq!(args.owner, Address::repeat_byte(0x11));
        assert_eq!(args.registry, Address::ZERO);
        assert_eq!(args.implementation, Address::ZERO);
        assert_eq!(args.split_a, 6_000);
        assert_eq!(args.split_b, 4_000);
        assert_eq!(args.slippage_bps, DEFAULT_SLIPPAGE_BPS);
        assert_eq!(args.reward_tokens, vec![Address::repeat_byte(0x77)]);
    }

    #[test]
    fn test_strategy_input_rejects_malformed_address() {
        let mut malformed = input();
        malformed.reward_tokens.push("not an address".to_string());

        assert!(matches!(
            StrategyInitArgs::try_from(malformed),
            Err(ManagerError::DecodingError(_))
        ));
    }

    #[test]
    fn test_strategy_input_rejects_oversized_split() {
        let mut oversized = input();
        oversized.split_a = Nat::from(100_000u32);

        assert!(StrategyInitArgs::try_from(oversized).is_err());
    }

    #[test]
    fn test_registry_init_args_conversion() {
        let config = RegistryConfig::try_from(RegistryInitArgs {
            admin: "0x1111111111111111111111111111111111111111".to_string(),
            operator: "0x2222222222222222222222222222222222222222".to_string(),
        })
        .unwrap();

        assert_eq!(config.admin, Address::repeat_byte(0x11));
        assert_eq!(config.operator, Address::repeat_byte(0x22));
    }
}
