//! Protocol legs of a strategy instance
//!
//! Thin typed wrappers over the protocol calls an instance makes. Every call
//! goes out with the instance as caller, and every failure the protocol can
//! report is turned into an `ExternalProtocolFailure`.

use alloy_primitives::{Address, U256};

use crate::{
    constants::LENDING_NO_ERROR,
    protocols::call_typed,
    types::{ICToken, IERC4626},
    utils::error::{protocol_failure, ManagerResult},
};

use super::allocation::ProtocolRef;

/// Returns Err unless a lending market status code reports success
fn check_status(market: Address, operation: &str, status: U256) -> ManagerResult<()> {
    if status != U256::from(LENDING_NO_ERROR) {
        return Err(protocol_failure(
            market,
            format!("{} returned status code {}", operation, status),
        ));
    }
    Ok(())
}

/// Supplies `amount` of the instance's idle base token to `protocol`
pub fn supply(instance: Address, protocol: ProtocolRef, amount: U256) -> ManagerResult<()> {
    match protocol {
        ProtocolRef::Lending(market) => {
            let status = call_typed(instance, market, &ICToken::mintCall { mintAmount: amount })?._0;
            check_status(market, "mint", status)
        }
        ProtocolRef::Vault(vault) => {
            let shares = call_typed(
                instance,
                vault,
                &IERC4626::depositCall {
                    assets: amount,
                    receiver: instance,
                },
            )?
            .shares;
            if shares.is_zero() {
                return Err(protocol_failure(vault, "deposit minted zero shares"));
            }
            Ok(())
        }
    }
}

/// Returns the base token value of the instance's position in `protocol`
pub fn position(instance: Address, protocol: ProtocolRef) -> ManagerResult<U256> {
    match protocol {
        ProtocolRef::Lending(market) => Ok(call_typed(
            instance,
            market,
            &ICToken::balanceOfUnderlyingCall { owner: instance },
        )?
        ._0),
        ProtocolRef::Vault(vault) => {
            let shares = call_typed(instance, vault, &IERC4626::balanceOfCall { owner: instance })?._0;
            if shares.is_zero() {
                return Ok(U256::ZERO);
            }
            Ok(call_typed(instance, vault, &IERC4626::convertToAssetsCall { shares })?.assets)
        }
    }
}

/// Pulls exactly `amount` of base token out of `protocol` back to the instance
pub fn pull(instance: Address, protocol: ProtocolRef, amount: U256) -> ManagerResult<()> {
    match protocol {
        ProtocolRef::Lending(market) => {
            let status = call_typed(
                instance,
                market,
                &ICToken::redeemUnderlyingCall {
                    redeemAmount: amount,
                },
            )?
            ._0;
            check_status(market, "redeemUnderlying", status)
        }
        ProtocolRef::Vault(vault) => {
            call_typed(
                instance,
                vault,
                &IERC4626::withdrawCall {
                    assets: amount,
                    receiver: instance,
                    owner: instance,
                },
            )?;
            Ok(())
        }
    }
}

/// Redeems every share the instance holds in `protocol`
pub fn exit(instance: Address, protocol: ProtocolRef) -> ManagerResult<()> {
    match protocol {
        ProtocolRef::Lending(market) => {
            let shares = call_typed(instance, market, &ICToken::balanceOfCall { owner: instance })?._0;
            if shares.is_zero() {
                return Ok(());
            }
            let status = call_typed(
                instance,
                market,
                &ICToken::redeemCall {
                    redeemTokens: shares,
                },
            )?
            ._0;
            check_status(market, "redeem", status)
        }
        ProtocolRef::Vault(vault) => {
            let shares = call_typed(instance, vault, &IERC4626::balanceOfCall { owner: instance })?._0;
            if shares.is_zero() {
                return Ok(());
            }
            call_typed(
                instance,
                vault,
                &IERC4626::redeemCall {
                    shares,
                    receiver: instance,
                    owner: instance,
                },
            )?;
            Ok(())
        }
    }
}

/// Returns the token `protocol` accepts
pub fn underlying(caller: Address, protocol: ProtocolRef) -> ManagerResult<Address> {
    match protocol {
        ProtocolRef::Lending(market) => Ok(call_typed(caller, market, &ICToken::underlyingCall {})?._0),
        ProtocolRef::Vault(vault) => Ok(call_typed(caller, vault, &IERC4626::assetCall {})?._0),
    }
}
