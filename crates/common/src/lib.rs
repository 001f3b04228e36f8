//! Sitegate Common Library
//!
//! Shared types, plugin inputs and build environment for the sitegate
//! end-to-end test gate.

pub mod config;
pub mod env;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    BaseUrlSource, PhaseInputs, PluginInputs, Recording, Seconds, SpaSetting, TestPhaseConfig,
    WaitOn,
};
pub use env::BuildEnv;
pub use error::{Error, Result};
pub use types::*;

/// Sitegate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name shown as the title of published status summaries
pub const PLUGIN_NAME: &str = "sitegate";

/// Default inputs file path
pub fn default_inputs_path() -> std::path::PathBuf {
    std::path::PathBuf::from("sitegate.toml")
}
