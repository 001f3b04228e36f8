//! Build environment captured once at the host boundary

use std::path::PathBuf;

/// Presence of this variable enables recording to the dashboard
pub const RECORD_KEY_VAR: &str = "CYPRESS_RECORD_KEY";
/// Unique build id, links recordings made by different phases of one build
pub const BUILD_ID_VAR: &str = "BUILD_ID";
/// Deploy context label (production, deploy-preview, ...)
pub const CONTEXT_VAR: &str = "CONTEXT";
/// Base URL of the deployed site
pub const DEPLOY_URL_VAR: &str = "DEPLOY_PRIME_URL";
pub const PUBLISH_DIR_VAR: &str = "PUBLISH_DIR";
pub const IS_LOCAL_VAR: &str = "IS_LOCAL";
pub const SITE_NAME_VAR: &str = "SITE_NAME";
/// Explicit chromium executable for the runner
pub const CHROMIUM_PATH_VAR: &str = "CHROMIUM_PATH";

/// Environment-derived constants for one phase invocation
///
/// The poller and the result interpreter never read the process environment;
/// everything they need flows through this struct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
    pub publish_dir: PathBuf,
    pub deploy_url: Option<String>,
    pub is_local: bool,
    pub record_key_present: bool,
    pub build_id: Option<String>,
    pub context: Option<String>,
    pub site_name: Option<String>,
    pub chromium_path: Option<PathBuf>,
}

impl BuildEnv {
    /// Capture the build environment from process variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Capture the build environment through an arbitrary lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            publish_dir: lookup(PUBLISH_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            deploy_url: non_empty(DEPLOY_URL_VAR),
            is_local: lookup(IS_LOCAL_VAR)
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
            // presence alone enables recording, an empty key is still a key
            record_key_present: lookup(RECORD_KEY_VAR).is_some(),
            build_id: non_empty(BUILD_ID_VAR),
            context: non_empty(CONTEXT_VAR),
            site_name: non_empty(SITE_NAME_VAR),
            chromium_path: non_empty(CHROMIUM_PATH_VAR).map(PathBuf::from),
        }
    }
}
