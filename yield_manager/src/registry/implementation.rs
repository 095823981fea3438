use alloy_primitives::Address;

/// Whitelisting record of an implementation. Never changes once written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImplementationRecord {
    pub implementation: Address,
    pub strategy_type: u64,
    pub whitelisted: bool,
}

impl ImplementationRecord {
    pub fn new(implementation: Address, strategy_type: u64) -> Self {
        Self {
            implementation,
            strategy_type,
            whitelisted: true,
        }
    }
}
