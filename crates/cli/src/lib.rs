//! Sitegate CLI
//!
//! Command-line build host: runs the test phases locally or in CI and maps
//! reported failures to the process exit status.

pub mod commands;
pub mod host;
pub mod output;
