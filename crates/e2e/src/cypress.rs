//! Cypress runner adapter
//!
//! Runs Cypress through its module API from a small generated node script.
//! The script writes the run results to a JSON file, which is read back and
//! classified into a `TestRunResult`. Cypress output itself streams straight
//! to the console.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, error, info};

use sitegate_common::{RunTotals, TestRunResult};

use crate::error::{E2eError, E2eResult};
use crate::runner::{RunRequest, SetupStep, TestRunner};

/// Cypress driven through `node` and `npx` in a project directory
#[derive(Debug, Clone)]
pub struct CypressRunner {
    /// Directory holding the project's `node_modules`
    project_dir: PathBuf,

    node: PathBuf,

    npx: PathBuf,
}

/// Options object handed to `cypress.run`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModuleRunOptions<'a> {
    #[serde(skip_serializing_if = "RunConfig::is_empty")]
    config: RunConfig<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    spec: Option<&'a str>,
    record: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ci_build_id: Option<&'a str>,
    browser: &'a str,
    headless: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<&'a Path>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    base_url: Option<&'a str>,
}

impl RunConfig<'_> {
    fn is_empty(&self) -> bool {
        self.base_url.is_none()
    }
}

/// The parts of the module API result that matter here
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModuleRunResults {
    #[serde(default)]
    failures: Option<u64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    total_passed: Option<u64>,
    #[serde(default)]
    total_failed: Option<u64>,
    #[serde(default)]
    total_pending: Option<u64>,
    #[serde(default)]
    total_skipped: Option<u64>,
    #[serde(default)]
    run_url: Option<String>,
}

impl CypressRunner {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            node: PathBuf::from("node"),
            npx: PathBuf::from("npx"),
        }
    }

    /// Use a specific `node` binary
    pub fn with_node(mut self, node: impl Into<PathBuf>) -> Self {
        self.node = node.into();
        self
    }

    pub fn with_npx(mut self, npx: impl Into<PathBuf>) -> Self {
        self.npx = npx.into();
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Build the node script running Cypress and writing results to `results_path`
    pub fn build_script(&self, request: &RunRequest, results_path: &Path) -> E2eResult<String> {
        let options = ModuleRunOptions {
            config: RunConfig {
                base_url: request.base_url.as_deref(),
            },
            spec: request.spec.as_deref(),
            record: request.record,
            group: request.group.as_deref(),
            tag: request.tag.as_deref(),
            ci_build_id: request.ci_build_id.as_deref(),
            browser: &request.browser,
            headless: request.headless,
            config_file: request.config_file.as_deref(),
        };
        let options = serde_json::to_string_pretty(&options)?;
        let results_path = serde_json::to_string(&results_path.to_string_lossy())?;

        Ok(format!(
            r#"const fs = require('fs');
const cypress = require(require.resolve('cypress', {{ paths: [process.cwd()] }}));

const options = {options};
const resultsPath = {results_path};

cypress.run(options).then(
  (results) => {{
    fs.writeFileSync(resultsPath, JSON.stringify(results));
  }},
  (error) => {{
    const message = String((error && error.message) || error);
    fs.writeFileSync(resultsPath, JSON.stringify({{ failures: 1, message }}));
    process.exitCode = 1;
  }},
);
"#
        ))
    }

    /// Classify the results JSON written by the script
    pub fn parse_results(json: &str) -> E2eResult<TestRunResult> {
        let results: ModuleRunResults = serde_json::from_str(json)?;

        if results.failures.unwrap_or(0) > 0 {
            let message = results
                .message
                .unwrap_or_else(|| "Cypress failed without running the tests".to_string());
            return Ok(TestRunResult::crashed(message));
        }

        let totals = RunTotals {
            passed: results.total_passed.unwrap_or(0),
            failed: results.total_failed.unwrap_or(0),
            pending: results.total_pending.unwrap_or(0),
            skipped: results.total_skipped.unwrap_or(0),
            run_url: results.run_url,
        };
        debug!("Cypress run results {:?}", totals);
        Ok(TestRunResult::Completed(totals))
    }

    /// `npx cypress <step>`
    async fn cli(&self, step: SetupStep) -> E2eResult<()> {
        debug!("running cypress {}", step);

        let mut cmd = Command::new(&self.npx);
        cmd.args(["cypress", step.as_arg()])
            .current_dir(&self.project_dir)
            .stdin(Stdio::null());

        // install output is noise unless debugging
        if step == SetupStep::Install && !tracing::enabled!(tracing::Level::DEBUG) {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let status = cmd.status().await.map_err(|e| E2eError::RunnerSetup {
            step,
            reason: e.to_string(),
        })?;

        if !status.success() {
            return Err(E2eError::RunnerSetup {
                step,
                reason: format!("cypress {} exited with {}", step, status),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TestRunner for CypressRunner {
    async fn prepare(&self) -> E2eResult<()> {
        for step in SetupStep::ALL {
            if let Err(e) = self.cli(step).await {
                error!("{}", step.failure_message());
                if step == SetupStep::Install {
                    error!("Add Cypress as a dev dependency: npm i -D cypress");
                }
                return Err(e);
            }
        }
        Ok(())
    }

    async fn run(&self, request: &RunRequest) -> E2eResult<TestRunResult> {
        info!(
            "running Cypress against {} (record: {})",
            request.base_url.as_deref().unwrap_or("the configured baseUrl"),
            request.record
        );

        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("run-cypress.js");
        let results_path = temp_dir.path().join("results.json");
        std::fs::write(&script_path, self.build_script(request, &results_path)?)?;

        debug!("Running Cypress script: {}", script_path.display());

        let status = Command::new(&self.node)
            .arg(&script_path)
            .current_dir(&self.project_dir)
            .stdin(Stdio::null())
            .status()
            .await?;

        match std::fs::read_to_string(&results_path) {
            Ok(json) => Self::parse_results(&json),
            Err(_) if !status.success() => Ok(TestRunResult::crashed(format!(
                "Cypress runner exited with {} before reporting results",
                status
            ))),
            Err(_) => Ok(TestRunResult::crashed("Cypress runner reported no results")),
        }
    }
}
