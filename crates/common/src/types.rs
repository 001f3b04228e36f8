//! Core types shared between the orchestrator, the runner adapter and the CLI

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Lifecycle hook at which tests may run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    PreBuild,
    PostBuild,
    OnSuccess,
}

impl Phase {
    /// All phases in the order the build host triggers them
    pub const ALL: [Phase; 3] = [Phase::PreBuild, Phase::PostBuild, Phase::OnSuccess];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::PreBuild => "preBuild",
            Phase::PostBuild => "postBuild",
            Phase::OnSuccess => "onSuccess",
        }
    }

    /// Recording group used when the inputs do not name one
    pub fn default_group(&self) -> &'static str {
        self.as_str()
    }

    /// Whether a failure in this phase fails the plugin rather than the build
    ///
    /// The site is already deployed when `onSuccess` runs, so failing the
    /// build is no longer possible.
    pub fn fails_plugin(&self) -> bool {
        matches!(self, Phase::OnSuccess)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Browser the test runner drives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    /// Primary engine
    #[default]
    Chromium,
    /// Alternate engine bundled with the runner
    Electron,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Electron => "electron",
        }
    }
}

impl FromStr for Browser {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" => Ok(Browser::Chromium),
            "electron" => Ok(Browser::Electron),
            _ => Err(Error::UnsupportedBrowser(s.to_string())),
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Test totals of a run that executed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    pub passed: u64,
    pub failed: u64,
    pub pending: u64,
    pub skipped: u64,
    /// Link to the recorded run on the dashboard, if the run was recorded
    pub run_url: Option<String>,
}

/// Structured result handed back by the test runner
///
/// A crashed run carries no totals: counts of a run that never executed are
/// not meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestRunResult {
    Crashed { message: String },
    Completed(RunTotals),
}

impl TestRunResult {
    pub fn crashed(message: impl Into<String>) -> Self {
        TestRunResult::Crashed {
            message: message.into(),
        }
    }

    pub fn is_crashed(&self) -> bool {
        matches!(self, TestRunResult::Crashed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("chromium", Browser::Chromium)]
    #[test_case("electron", Browser::Electron)]
    #[test_case(" Electron ", Browser::Electron; "trimmed and case insensitive")]
    fn test_parse_browser(input: &str, expected: Browser) {
        assert_eq!(input.parse::<Browser>().unwrap(), expected);
    }

    #[test]
    fn test_reject_unknown_browser() {
        let err = "firefox".parse::<Browser>().unwrap_err();
        assert!(err.to_string().contains("firefox"));
    }

    #[test]
    fn test_default_groups() {
        assert_eq!(Phase::PreBuild.default_group(), "preBuild");
        assert_eq!(Phase::PostBuild.default_group(), "postBuild");
        assert_eq!(Phase::OnSuccess.default_group(), "onSuccess");
        assert!(Phase::OnSuccess.fails_plugin());
        assert!(!Phase::PostBuild.fails_plugin());
    }
}
