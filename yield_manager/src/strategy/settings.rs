//! Strategy settings fixed at initialization

use alloy_primitives::Address;

/// Settings that are set once by `initialize` and never change afterwards
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StrategySettings {
    /// Address of the instance. Key in `STRATEGY_STATE`.
    pub address: Address,
    /// Registry the instance is bound to
    pub registry: Address,
    /// Strategy family, fixed for the lifetime of the instance
    pub strategy_type: u64,
    /// Base token deposited, withdrawn and allocated
    pub token: Address,
    /// Gate consulted before every reward swap
    pub price_checker: Address,
    /// Swap facility used to convert rewards into the base token
    pub swap_router: Address,
    /// Maximum tolerated deviation from the expected swap output
    pub slippage_bps: u16,
}

impl StrategySettings {
    /// Sets the address of the instance.
    pub fn address(&mut self, address: Address) -> &mut Self {
        self.address = address;
        self
    }

    /// Sets the registry the instance is bound to.
    pub fn registry(&mut self, registry: Address) -> &mut Self {
        self.registry = registry;
        self
    }

    /// Sets the strategy type id.
    pub fn strategy_type(&mut self, strategy_type: u64) -> &mut Self {
        self.strategy_type = strategy_type;
        self
    }

    /// Sets the base token.
    pub fn token(&mut self, token: Address) -> &mut Self {
        self.token = token;
        self
    }

    /// Sets the price checker.
    pub fn price_checker(&mut self, price_checker: Address) -> &mut Self {
        self.price_checker = price_checker;
        self
    }

    /// Sets the swap router.
    pub fn swap_router(&mut self, swap_router: Address) -> &mut Self {
        self.swap_router = swap_router;
        self
    }

    /// Sets the slippage tolerance in basis points.
    pub fn slippage_bps(&mut self, slippage_bps: u16) -> &mut Self {
        self.slippage_bps = slippage_bps;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strategy_settings_setters() {
        let mut settings = StrategySettings::default();

        settings
            .address(Address::repeat_byte(0x11))
            .registry(Address::repeat_byte(0x22))
            .strategy_type(3)
            .token(Address::repeat_byte(0x33))
            .price_checker(Address::repeat_byte(0x44))
            .swap_router(Address::repeat_byte(0x55))
            .slippage_bps(250);

        assert_eq!(settings.address, Address::repeat_byte(0x11));
        assert_eq!(settings.registry, Address::repeat_byte(0x22));
        assert_eq!(settings.strategy_type, 3);
        assert_eq!(settings.token, Address::repeat_byte(0x33));
        assert_eq!(settings.price_checker, Address::repeat_byte(0x44));
        assert_eq!(settings.swap_router, Address::repeat_byte(0x55));
        assert_eq!(settings.slippage_bps, 250);
    }

    proptest! {
        #[test]
        fn test_setters_keep_other_fields(
            strategy_type in any::<u64>(),
            slippage_bps in any::<u16>(),
            byte in any::<u8>(),
        ) {
            let mut settings = StrategySettings::default();
            settings.registry(Address::repeat_byte(byte));
            settings.strategy_type(strategy_type).slippage_bps(slippage_bps);

            prop_assert_eq!(settings.registry, Address::repeat_byte(byte));
            prop_assert_eq!(settings.strategy_type, strategy_type);
            prop_assert_eq!(settings.slippage_bps, slippage_bps);
            prop_assert_eq!(settings.token, Address::ZERO);
        }
    }
}
