//! Strategy Reentrancy Lock
//!
//! Every engine operation takes the lock of its instance and persists it
//! before calling into a protocol or the swap facility. Foreign code that
//! calls back into the same instance finds it locked and is rejected.
//!
//! ```plain
//! Lock State Machine:
//!
//!                   ┌──────────┐
//!              ┌────► Unlocked │
//!              │    └──────────┘
//!              │         │
//!           unlock    try_lock
//!      (acquired only)   │
//!              │         ▼
//!              │    ┌─────────┐
//!              └────┤ Locked  ├──── try_lock ──► Err(Locked)
//!                   └─────────┘
//! ```
//!
//! There is no timeout: operations are atomic, so a lock can never outlive
//! the operation that took it.

use candid::CandidType;
use serde::Deserialize;

use crate::utils::error::{ManagerError, ManagerResult};

#[derive(Clone, Copy, CandidType, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Lock {
    /// Status of the lock. `true` represents locked and `false` unlocked
    pub is_locked: bool,
}

impl Lock {
    /// Attempts to acquire the lock.
    ///
    /// # Returns
    /// * `Ok(())` - Lock successfully acquired
    /// * `Err(ManagerError::Locked)` - The instance is already executing
    pub fn try_lock(&mut self) -> ManagerResult<()> {
        if self.is_locked {
            return Err(ManagerError::Locked);
        }
        self.is_locked = true;
        Ok(())
    }

    /// Releases the lock if the caller is the one that acquired it.
    pub fn unlock(&mut self, acquired_lock: bool) -> &mut Self {
        if acquired_lock {
            self.is_locked = false;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_is_exclusive() {
        let mut lock = Lock::default();

        assert!(lock.try_lock().is_ok());
        assert_eq!(lock.try_lock(), Err(ManagerError::Locked));
    }

    #[test]
    fn test_unlock_requires_acquisition() {
        let mut lock = Lock::default();
        lock.try_lock().unwrap();

        lock.unlock(false);
        assert!(lock.is_locked);

        lock.unlock(true);
        assert!(!lock.is_locked);
        assert!(lock.try_lock().is_ok());
    }
}
