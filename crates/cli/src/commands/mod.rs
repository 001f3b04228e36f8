//! CLI command implementations

pub mod phase;
pub mod ping;
