//! Simulated share vault (ProtocolB)
//!
//! ERC-4626 style vault. The share price is the vault's asset balance divided
//! by the total share supply, so assets sent straight to the vault show up as
//! yield for every share holder. Failures revert the call.

use std::{collections::HashMap, rc::Rc};

use alloy_primitives::{Address, U256};
use alloy_sol_types::{SolCall, SolInterface};

use crate::{
    code::{deploy, Code},
    ledger,
    state::VAULTS,
    types::IERC4626::{self, IERC4626Calls},
    utils::error::*,
};

/// Code the vault runs after a deposit completes, with full access to the host
pub type DepositHook = Rc<dyn Fn()>;

#[derive(Clone, Default)]
pub struct ShareVault {
    /// Token accepted by the vault
    pub asset: Address,
    pub shares: HashMap<Address, U256>,
    pub total_shares: U256,
    /// When `true`, every mutating call reverts
    pub paused: bool,
    /// Called once per deposit after the vault's own state is settled
    pub on_deposit: Option<DepositHook>,
}

impl ShareVault {
    pub fn new(asset: Address) -> Self {
        Self {
            asset,
            ..Default::default()
        }
    }

    fn shares_of(&self, holder: Address) -> U256 {
        self.shares.get(&holder).copied().unwrap_or_default()
    }

    fn total_assets(&self, vault: Address) -> U256 {
        ledger::balance_of(self.asset, vault)
    }

    fn convert_to_assets(&self, vault: Address, shares: U256) -> ManagerResult<U256> {
        if self.total_shares.is_zero() {
            return Ok(shares);
        }
        shares
            .checked_mul(self.total_assets(vault))
            .map(|scaled| scaled / self.total_shares)
            .ok_or_else(|| arithmetic_err("Vault share conversion overflowed."))
    }

    fn convert_to_shares(&self, vault: Address, assets: U256, round_up: bool) -> ManagerResult<U256> {
        let total_assets = self.total_assets(vault);
        if self.total_shares.is_zero() || total_assets.is_zero() {
            return Ok(assets);
        }
        let scaled = assets
            .checked_mul(self.total_shares)
            .ok_or_else(|| arithmetic_err("Vault share conversion overflowed."))?;
        if round_up {
            scaled
                .checked_add(total_assets - U256::from(1))
                .map(|rounded| rounded / total_assets)
                .ok_or_else(|| arithmetic_err("Vault share conversion overflowed."))
        } else {
            Ok(scaled / total_assets)
        }
    }

    fn ensure_active(&self, vault: Address) -> ManagerResult<()> {
        if self.paused {
            return Err(protocol_failure(vault, "vault is paused"));
        }
        Ok(())
    }

    fn deposit(
        &mut self,
        vault: Address,
        caller: Address,
        assets: U256,
        receiver: Address,
    ) -> ManagerResult<U256> {
        self.ensure_active(vault)?;
        let shares = self.convert_to_shares(vault, assets, false)?;
        if shares.is_zero() {
            return Err(protocol_failure(vault, "deposit would mint zero shares"));
        }
        ledger::transfer(self.asset, caller, vault, assets)
            .map_err(|err| protocol_failure(vault, format!("asset transfer failed: {:?}", err)))?;

        *self.shares.entry(receiver).or_default() += shares;
        self.total_shares += shares;
        Ok(shares)
    }

    fn burn_and_pay(
        &mut self,
        vault: Address,
        caller: Address,
        owner: Address,
        receiver: Address,
        shares: U256,
        assets: U256,
    ) -> ManagerResult<()> {
        if caller != owner {
            return Err(protocol_failure(vault, "caller is not the share owner"));
        }
        let balance = self.shares_of(owner);
        if shares > balance {
            return Err(protocol_failure(vault, "redeem exceeds share balance"));
        }
        ledger::transfer(self.asset, vault, receiver, assets)
            .map_err(|err| protocol_failure(vault, format!("asset transfer failed: {:?}", err)))?;

        self.shares.insert(owner, balance - shares);
        self.total_shares -= shares;
        Ok(())
    }
}

/// Handles calldata sent to the vault at `target`
pub(super) fn dispatch(caller: Address, target: Address, data: &[u8]) -> ManagerResult<Vec<u8>> {
    let decoded = IERC4626Calls::abi_decode(data, true)
        .map_err(|err| protocol_failure(target, format!("vault rejected call: {}", err)))?;

    let (response, hook) = VAULTS.with(|vaults| {
        let mut binding = vaults.borrow_mut();
        let vault = binding
            .get_mut(&target)
            .ok_or_else(|| protocol_failure(target, "vault has no state"))?;

        let mut hook = None;
        let response = match decoded {
            IERC4626Calls::deposit(call) => {
                let shares = vault.deposit(target, caller, call.assets, call.receiver)?;
                hook = vault.on_deposit.clone();
                IERC4626::depositCall::abi_encode_returns(&(shares,))
            }
            IERC4626Calls::redeem(call) => {
                let assets = vault.convert_to_assets(target, call.shares)?;
                vault.burn_and_pay(target, caller, call.owner, call.receiver, call.shares, assets)?;
                IERC4626::redeemCall::abi_encode_returns(&(assets,))
            }
            IERC4626Calls::withdraw(call) => {
                let shares = vault.convert_to_shares(target, call.assets, true)?;
                vault.burn_and_pay(target, caller, call.owner, call.receiver, shares, call.assets)?;
                IERC4626::withdrawCall::abi_encode_returns(&(shares,))
            }
            IERC4626Calls::balanceOf(call) => {
                IERC4626::balanceOfCall::abi_encode_returns(&(vault.shares_of(call.owner),))
            }
            IERC4626Calls::convertToAssets(call) => {
                let assets = vault.convert_to_assets(target, call.shares)?;
                IERC4626::convertToAssetsCall::abi_encode_returns(&(assets,))
            }
            IERC4626Calls::asset(_) => IERC4626::assetCall::abi_encode_returns(&(vault.asset,)),
        };

        Ok::<_, ManagerError>((response, hook))
    })?;

    // The vault's state is released before foreign code runs
    if let Some(hook) = hook {
        hook();
    }

    Ok(response)
}

/// Deploys a share vault for `asset` and returns its address
pub fn deploy_share_vault(deployer: Address, asset: Address) -> Address {
    let address = deploy(deployer, Code::ShareVault);
    VAULTS.with(|vaults| vaults.borrow_mut().insert(address, ShareVault::new(asset)));
    address
}

/// Pauses or resumes the vault
pub fn set_paused(vault: Address, paused: bool) -> ManagerResult<()> {
    with_vault_mut(vault, |state| state.paused = paused)
}

/// Installs code that runs after every deposit into the vault
pub fn set_deposit_hook(vault: Address, hook: Option<DepositHook>) -> ManagerResult<()> {
    with_vault_mut(vault, |state| state.on_deposit = hook)
}

fn with_vault_mut<F: FnOnce(&mut ShareVault)>(vault: Address, f: F) -> ManagerResult<()> {
    VAULTS.with(|vaults| {
        let mut binding = vaults.borrow_mut();
        let state = binding
            .get_mut(&vault)
            .ok_or(ManagerError::NonExistentValue)?;
        f(state);
        Ok(())
    })
}
