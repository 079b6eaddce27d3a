//! Command implementations

pub(crate) mod common;
pub mod dump;
pub mod load;
