use alloy_primitives::{Address, U256};
use candid::CandidType;
use serde::Deserialize;

/// Yield Manager Result
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Yield Manager Errors
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub enum ManagerError {
    /// The caller does not hold the role required by the operation
    Unauthorized(Role),
    /// The operation would break a registry or strategy invariant
    InvariantViolation(Violation),
    /// Not enough funds to satisfy a transfer, withdrawal or rebalance
    InsufficientFunds { requested: String, available: String },
    /// The called protocol returned a failure, or the call itself failed
    ExternalProtocolFailure { target: String, reason: String },
    /// The swap output was rejected by the price checker gate
    SlippageExceeded {
        token: String,
        amount_out: String,
        min_out: String,
    },
    /// Strategy is locked
    Locked,
    /// A requested value does not exist
    NonExistentValue,
    /// Decoding issue
    DecodingError(String),
    /// Arithmetic error
    Arithmetic(String),
    /// Unknown/Custom error
    Custom(String),
}

/// Roles checked by the registry, the factory and strategy instances
#[derive(Clone, Copy, CandidType, Debug, Deserialize, PartialEq, Eq)]
pub enum Role {
    /// Registry administrator
    Admin,
    /// Registry administrator or a factory authorized by it
    Factory,
    /// Owner of a strategy instance
    Owner,
    /// Designated operator of the registry
    Operator,
    /// Either the owner of the instance or the designated operator
    OwnerOrOperator,
    /// The registry the instance is bound to
    Registry,
    /// A strategy instance registered in the registry
    RegisteredStrategy,
}

/// The specific precondition an operation violated
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub enum Violation {
    /// Basis points do not add up to 10000
    SplitMismatch { total: u32 },
    /// Weights do not match the number of allocations
    AllocationLength { expected: u32, found: u32 },
    AlreadyWhitelisted,
    NotWhitelisted,
    UnknownStrategyType(u64),
    /// The sentinel type id cannot be used for an instance
    InvalidStrategyType,
    NotLatestImplementation,
    SameImplementation,
    TypeMismatch { expected: u64, found: u64 },
    AlreadyRegistered,
    NotRegistered,
    /// The instance reports a different owner than the one being registered
    OwnerMismatch,
    /// The instance points at another registry
    ForeignRegistry,
    AlreadyInitialized,
    NotInitialized,
    /// A required reference was null; carries the field name
    NullAddress(String),
    ZeroAmount,
    SameOwner,
    SlippageOutOfRange(u16),
    /// A protocol does not use the strategy's base token as its asset
    AssetMismatch(String),
    BaseTokenAsReward,
    AlreadyDeployed(String),
    /// The address does not hold the expected kind of code
    MissingCode { address: String, expected: String },
}

impl From<Violation> for ManagerError {
    fn from(value: Violation) -> Self {
        ManagerError::InvariantViolation(value)
    }
}

pub fn arithmetic_err<S: AsRef<str>>(s: S) -> ManagerError {
    ManagerError::Arithmetic(format!("{:#?}", s.as_ref()))
}

pub fn insufficient_funds(requested: U256, available: U256) -> ManagerError {
    ManagerError::InsufficientFunds {
        requested: requested.to_string(),
        available: available.to_string(),
    }
}

pub fn protocol_failure<S: AsRef<str>>(target: Address, reason: S) -> ManagerError {
    ManagerError::ExternalProtocolFailure {
        target: target.to_string(),
        reason: reason.as_ref().to_string(),
    }
}

pub fn null_address<S: AsRef<str>>(field: S) -> ManagerError {
    Violation::NullAddress(field.as_ref().to_string()).into()
}
