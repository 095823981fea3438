//! Common utility and helper functions that are used across the project

use std::str::FromStr;

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use candid::Nat;
use num_bigint::BigUint;
use num_traits::ToPrimitive;

use super::error::*;

/// Converts String to Address and returns ManagerError on failure
pub fn string_to_address(input: String) -> ManagerResult<Address> {
    Address::from_str(&input).map_err(|err| ManagerError::DecodingError(format!("{:#?}", err)))
}

/// Converts values of type `U256` to `Nat`
pub fn u256_to_nat(n: &U256) -> ManagerResult<Nat> {
    Ok(Nat(BigUint::from_bytes_be(&n.to_be_bytes::<32>())))
}

/// Converts a `Nat` to basis points, rejecting anything that does not fit in `u16`
pub fn nat_to_bps(n: &Nat) -> ManagerResult<u16> {
    n.0.to_u16().ok_or(ManagerError::DecodingError(format!(
        "{} does not fit into basis points.",
        n
    )))
}

/// Returns `T` from the ABI-encoded return data of `F`.
pub fn decode_abi_response<T, F: SolCall<Return = T>>(data: &[u8]) -> ManagerResult<T> {
    F::abi_decode_returns(data, false).map_err(|err| ManagerError::DecodingError(err.to_string()))
}

/// Returns Err if `address` is the null address. `field` names the rejected argument.
pub fn ensure_not_null(address: Address, field: &str) -> ManagerResult<()> {
    if address == Address::ZERO {
        return Err(null_address(field));
    }
    Ok(())
}

/// Current time in seconds
pub fn now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ICToken;

    #[test]
    fn test_string_to_address_valid() {
        let input = "0x0123456789abcdef0123456789abcdef01234567".to_string();
        let result = string_to_address(input.clone());
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), Address::from_str(&input).unwrap());
    }

    #[test]
    fn test_string_to_address_invalid() {
        let result = string_to_address("invalid_address".to_string());
        assert!(matches!(result, Err(ManagerError::DecodingError(_))));
    }

    #[test]
    fn test_u256_to_nat() {
        let value = 1234567890_u64;
        assert_eq!(u256_to_nat(&U256::from(value)).unwrap(), Nat::from(value));

        let max = u256_to_nat(&U256::MAX).unwrap();
        assert_eq!(max, Nat((BigUint::from(1u8) << 256) - BigUint::from(1u8)));
    }

    #[test]
    fn test_nat_to_bps() {
        assert_eq!(nat_to_bps(&Nat::from(6_000u32)).unwrap(), 6_000);
        assert!(nat_to_bps(&Nat::from(70_000u32)).is_err());
    }

    #[test]
    fn test_decode_abi_response() {
        let encoded = ICToken::mintCall::abi_encode_returns(&(U256::from(7),));
        let decoded = decode_abi_response::<ICToken::mintReturn, ICToken::mintCall>(&encoded);
        assert_eq!(decoded.unwrap()._0, U256::from(7));

        let truncated = decode_abi_response::<ICToken::mintReturn, ICToken::mintCall>(&[0u8; 3]);
        assert!(matches!(truncated, Err(ManagerError::DecodingError(_))));
    }

    #[test]
    fn test_ensure_not_null() {
        assert!(ensure_not_null(Address::repeat_byte(1), "owner").is_ok());
        assert_eq!(
            ensure_not_null(Address::ZERO, "owner"),
            Err(ManagerError::InvariantViolation(Violation::NullAddress(
                "owner".to_string()
            )))
        );
    }
}
