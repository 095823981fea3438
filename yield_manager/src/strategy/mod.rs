pub(crate) mod allocation;
pub(crate) mod data;
pub(crate) mod run;
pub(crate) mod settings;
pub(crate) mod stable;
// Only strategy code may hold an executable (and with it the lock)
pub(in crate::strategy) mod executable;
pub(crate) mod lock;
pub(in crate::strategy) mod positions;
