//! Strategy registry

mod actions;
pub(crate) mod data;
pub(crate) mod implementation;
pub(crate) mod ownership;

pub use actions::*;

