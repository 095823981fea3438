//! Fungible token balances held by every account

use alloy_primitives::{Address, U256};

use crate::{
    state::LEDGER,
    utils::error::{arithmetic_err, insufficient_funds, ManagerResult},
};

/// Returns the balance of `holder` in `token`
pub fn balance_of(token: Address, holder: Address) -> U256 {
    LEDGER.with(|ledger| {
        ledger
            .borrow()
            .get(&(token, holder))
            .copied()
            .unwrap_or_default()
    })
}

/// Credits `amount` of newly created `token` to `to`
pub fn mint(token: Address, to: Address, amount: U256) -> ManagerResult<()> {
    LEDGER.with(|ledger| {
        let mut binding = ledger.borrow_mut();
        let balance = binding.entry((token, to)).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| arithmetic_err("Token balance overflowed."))?;
        Ok(())
    })
}

/// Moves `amount` of `token` from `from` to `to`.
/// Fails without any change if `from` holds less than `amount`.
pub fn transfer(token: Address, from: Address, to: Address, amount: U256) -> ManagerResult<()> {
    if amount.is_zero() || from == to {
        return Ok(());
    }

    LEDGER.with(|ledger| {
        let mut binding = ledger.borrow_mut();
        let available = binding.get(&(token, from)).copied().unwrap_or_default();
        if available < amount {
            return Err(insufficient_funds(amount, available));
        }

        let receiver_balance = binding.get(&(token, to)).copied().unwrap_or_default();
        let new_receiver_balance = receiver_balance
            .checked_add(amount)
            .ok_or_else(|| arithmetic_err("Token balance overflowed."))?;

        binding.insert((token, from), available - amount);
        binding.insert((token, to), new_receiver_balance);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ManagerError;

    #[test]
    fn test_transfer_moves_balance() {
        let token = Address::repeat_byte(0xaa);
        let alice = Address::repeat_byte(0x01);
        let bob = Address::repeat_byte(0x02);
        mint(token, alice, U256::from(100)).unwrap();

        transfer(token, alice, bob, U256::from(40)).unwrap();

        assert_eq!(balance_of(token, alice), U256::from(60));
        assert_eq!(balance_of(token, bob), U256::from(40));
    }

    #[test]
    fn test_transfer_rejects_overdraft() {
        let token = Address::repeat_byte(0xaa);
        let alice = Address::repeat_byte(0x01);
        let bob = Address::repeat_byte(0x02);
        mint(token, alice, U256::from(5)).unwrap();

        let result = transfer(token, alice, bob, U256::from(6));

        assert_eq!(
            result,
            Err(ManagerError::InsufficientFunds {
                requested: "6".to_string(),
                available: "5".to_string()
            })
        );
        assert_eq!(balance_of(token, alice), U256::from(5));
        assert_eq!(balance_of(token, bob), U256::ZERO);
    }

    #[test]
    fn test_mint_overflow_is_reported() {
        let token = Address::repeat_byte(0xaa);
        let alice = Address::repeat_byte(0x01);
        mint(token, alice, U256::MAX).unwrap();

        assert!(matches!(
            mint(token, alice, U256::from(1)),
            Err(ManagerError::Arithmetic(_))
        ));
    }
}
