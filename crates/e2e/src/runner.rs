//! Test-runner seam - what the orchestrator hands to the runner and gets back

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use sitegate_common::{Browser, BuildEnv, TestPhaseConfig, TestRunResult};

use crate::error::E2eResult;

/// Everything the runner needs for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// `None` leaves the base URL to the runner's own config
    pub base_url: Option<String>,
    pub spec: Option<String>,
    pub record: bool,
    pub group: Option<String>,
    pub tag: Option<String>,
    pub ci_build_id: Option<String>,
    /// Browser executable path or name
    pub browser: String,
    pub headless: bool,
    pub config_file: Option<PathBuf>,
}

impl RunRequest {
    pub fn for_phase(config: &TestPhaseConfig, base_url: Option<String>, env: &BuildEnv) -> Self {
        let recording = config.recording.as_ref();
        Self {
            base_url,
            spec: config.spec.clone(),
            record: recording.is_some(),
            group: recording.map(|r| r.group.clone()),
            tag: recording.and_then(|r| r.tag.clone()),
            ci_build_id: recording.and_then(|r| r.build_id.clone()),
            browser: resolve_browser(config.browser, env),
            headless: true,
            config_file: config.config_file.clone(),
        }
    }
}

/// Name or path handed to the runner for `browser`
pub fn resolve_browser(browser: Browser, env: &BuildEnv) -> String {
    match browser {
        Browser::Electron => Browser::Electron.as_str().to_string(),
        Browser::Chromium => env
            .chromium_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| Browser::Chromium.as_str().to_string()),
    }
}

/// Steps run before the first phase to make sure the runner works
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    Install,
    Verify,
    Info,
}

impl SetupStep {
    pub const ALL: [SetupStep; 3] = [SetupStep::Install, SetupStep::Verify, SetupStep::Info];

    pub fn as_arg(&self) -> &'static str {
        match self {
            SetupStep::Install => "install",
            SetupStep::Verify => "verify",
            SetupStep::Info => "info",
        }
    }

    /// Message the build is failed with when this step fails
    pub fn failure_message(&self) -> &'static str {
        match self {
            SetupStep::Install => {
                "Failed to install Cypress. Did you forget to add Cypress as a dev dependency?"
            }
            SetupStep::Verify => "Failed to verify Cypress",
            SetupStep::Info => "Failed Cypress info",
        }
    }
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

/// The external test runner
///
/// `run` returning `Err` means the runner could not be invoked at all; the
/// orchestrator treats that exactly like a `TestRunResult::Crashed`.
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Make sure the runner is installed and usable
    async fn prepare(&self) -> E2eResult<()> {
        Ok(())
    }

    async fn run(&self, request: &RunRequest) -> E2eResult<TestRunResult>;
}
