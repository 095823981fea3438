//! Utility and helper functions needed for:
//! - Error handling
//! - ABI decoding of external call results
//! - Type casting between candid and EVM types

pub(crate) mod common;
pub(crate) mod error;
