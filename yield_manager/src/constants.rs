//! Yield Manager's Constants

use alloy_primitives::U256;

/// Basis points making up 100%
pub const BPS_DENOMINATOR: u16 = 10_000;
pub fn bps_denominator() -> U256 {
    U256::from(BPS_DENOMINATOR)
}

/// Strategy type id that asks the registry to allocate a new family
pub const NEW_STRATEGY_TYPE: u64 = 0;

/// Scale used for the lending market's exchange rate mantissa
pub const EXCHANGE_RATE_SCALE: u128 = 1_000_000_000_000_000_000; // e18
pub fn exchange_rate_scale() -> U256 {
    U256::from(EXCHANGE_RATE_SCALE)
}

/// Default slippage tolerance for reward swaps
pub const DEFAULT_SLIPPAGE_BPS: u16 = 100; // 1%

/// Number of journal collections kept after a cleanup
pub const MAX_JOURNAL_COLLECTIONS: usize = 300;

/// Tag hashed into the CREATE2 init code hash of strategy instances
pub const STRATEGY_CODE_TAG: &[u8] = b"yield_manager::strategy_instance";

/// Lending market status codes. Zero is success.
pub const LENDING_NO_ERROR: u64 = 0;
pub const LENDING_MATH_ERROR: u64 = 9;
pub const LENDING_INSUFFICIENT_SHARES: u64 = 11;
pub const LENDING_TRANSFER_FAILED: u64 = 13;
