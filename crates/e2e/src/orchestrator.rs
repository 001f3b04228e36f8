//! Phase orchestration
//!
//! One phase invocation walks
//!
//! ```text
//! Idle -> Starting -> Polling? -> Serving? -> Running -> TearingDown -> Done
//! ```
//!
//! Early failures (bad config, unreachable URL, unservable folder) skip
//! `Running` and go straight to `TearingDown`. Teardown always runs and
//! releases every process and server the invocation created before anything
//! is reported to the host.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use sitegate_common::{
    BaseUrlSource, BuildEnv, Phase, PhaseInputs, TestPhaseConfig, TestRunResult,
};
use sitegate_web::{serve_folder, StaticServer, WebError, DEFAULT_PORT};

use crate::error::{E2eError, E2eResult};
use crate::host::{report_failure, BuildHost};
use crate::ping::{PollOutcome, PollRequest, Pinger};
use crate::process::{start_if_configured, ProcessHandle};
use crate::report::{interpret, Verdict};
use crate::runner::{RunRequest, TestRunner};

/// How one phase invocation ended, as reported to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// Phase not enabled, nothing ran
    Skipped,
    /// Failed before tests could run
    Failed { message: String },
    /// Tests ran, or the runner crashed trying
    Completed(Verdict),
}

impl PhaseOutcome {
    pub fn is_failure(&self) -> bool {
        match self {
            PhaseOutcome::Skipped => false,
            PhaseOutcome::Failed { .. } => true,
            PhaseOutcome::Completed(verdict) => !verdict.is_success(),
        }
    }
}

/// Failure that ends a phase before `Running`
struct EarlyFailure {
    message: String,
    error: E2eError,
}

impl EarlyFailure {
    fn new(message: impl Into<String>, error: E2eError) -> Self {
        Self {
            message: message.into(),
            error,
        }
    }
}

/// Something bound during a phase that must be closed on teardown
#[async_trait]
trait Closable: Send {
    async fn close(self: Box<Self>) -> Result<(), WebError>;
}

#[async_trait]
impl Closable for StaticServer {
    async fn close(self: Box<Self>) -> Result<(), WebError> {
        StaticServer::close(*self).await
    }
}

/// Everything a phase invocation started and must release
#[derive(Default)]
struct PhaseResources {
    process: Option<ProcessHandle>,
    server: Option<Box<dyn Closable>>,
}

impl PhaseResources {
    /// Stop the process, then close the server
    ///
    /// Both are attempted; a failing close is returned after the process is
    /// already stopped.
    async fn release(&mut self) -> Result<(), WebError> {
        if let Some(mut process) = self.process.take() {
            debug!("stopping start command");
            process.stop();
        }
        if let Some(server) = self.server.take() {
            server.close().await?;
        }
        Ok(())
    }
}

/// Tear down, then report what happened
///
/// Nothing reaches the host until every resource is released. A failed
/// release is returned as `Err` and the results are left uninterpreted.
async fn conclude(
    phase: Phase,
    result: Result<TestRunResult, EarlyFailure>,
    mut resources: PhaseResources,
    host: &dyn BuildHost,
) -> E2eResult<PhaseOutcome> {
    info!("{}: tearing down", phase);
    resources.release().await?;

    match result {
        Err(failure) => {
            error!("{}: {}", phase, failure.error);
            report_failure(host, phase, &failure.message, &failure.error);
            Ok(PhaseOutcome::Failed {
                message: failure.message,
            })
        }
        Ok(run) => {
            let verdict = interpret(
                &run,
                |message, error| report_failure(host, phase, message, error),
                |summary| host.show_status(summary),
            );
            info!("{}: {:?}", phase, verdict);
            Ok(PhaseOutcome::Completed(verdict))
        }
    }
}

/// Runs test phases against a runner
pub struct Orchestrator {
    runner: Arc<dyn TestRunner>,
    pinger: Pinger,
    server_port: u16,
}

impl Orchestrator {
    pub fn new(runner: Arc<dyn TestRunner>, pinger: Pinger) -> Self {
        Self {
            runner,
            pinger,
            server_port: DEFAULT_PORT,
        }
    }

    /// Port for the publish folder server (0 = any free port)
    pub fn with_server_port(mut self, port: u16) -> Self {
        self.server_port = port;
        self
    }

    /// Before the build: prepare the runner, then test against a started app
    pub async fn pre_build(
        &self,
        inputs: &PhaseInputs,
        env: &BuildEnv,
        host: &dyn BuildHost,
    ) -> E2eResult<PhaseOutcome> {
        // the runner is prepared even when preBuild tests are off, later
        // phases depend on it
        if let Err(e) = self.runner.prepare().await {
            let message = match &e {
                E2eError::RunnerSetup { step, .. } => step.failure_message().to_string(),
                other => other.to_string(),
            };
            report_failure(host, Phase::PreBuild, &message, &e);
            return Ok(PhaseOutcome::Failed { message });
        }

        self.run_phase(Phase::PreBuild, inputs, env, host).await
    }

    /// After the build: test the publish folder or a started app
    pub async fn post_build(
        &self,
        inputs: &PhaseInputs,
        env: &BuildEnv,
        host: &dyn BuildHost,
    ) -> E2eResult<PhaseOutcome> {
        self.run_phase(Phase::PostBuild, inputs, env, host).await
    }

    /// After a successful deploy: test the deployed site
    pub async fn on_success(
        &self,
        inputs: &PhaseInputs,
        env: &BuildEnv,
        host: &dyn BuildHost,
    ) -> E2eResult<PhaseOutcome> {
        debug!(
            "onSuccess against {:?} (site: {:?}, local: {})",
            env.deploy_url, env.site_name, env.is_local
        );
        self.run_phase(Phase::OnSuccess, inputs, env, host).await
    }

    /// Run one phase invocation
    ///
    /// Failures are reported through `host`. `Err` is returned only when
    /// teardown could not release a resource.
    pub async fn run_phase(
        &self,
        phase: Phase,
        inputs: &PhaseInputs,
        env: &BuildEnv,
        host: &dyn BuildHost,
    ) -> E2eResult<PhaseOutcome> {
        debug!("{} inputs {:?}", phase, inputs);

        let config = match TestPhaseConfig::resolve(phase, inputs, env) {
            Ok(config) => config,
            Err(e) => {
                let error = E2eError::from(e);
                let message = error.to_string();
                report_failure(host, phase, &message, &error);
                return Ok(PhaseOutcome::Failed { message });
            }
        };

        if !config.enabled {
            debug!("Skipping {} tests", phase);
            return Ok(PhaseOutcome::Skipped);
        }

        let mut resources = PhaseResources::default();
        let result = self.execute(&config, env, &mut resources).await;
        conclude(phase, result, resources, host).await
    }

    /// Starting, Polling, Serving and Running
    ///
    /// Whatever gets started is parked in `resources` as soon as it exists.
    async fn execute(
        &self,
        config: &TestPhaseConfig,
        env: &BuildEnv,
        resources: &mut PhaseResources,
    ) -> Result<TestRunResult, EarlyFailure> {
        let phase = config.phase;

        if config.serves_publish_dir() && !env.publish_dir.is_dir() {
            let dir = env.publish_dir.display().to_string();
            let error = E2eError::Serve {
                dir: dir.clone(),
                source: WebError::FolderNotFound(env.publish_dir.clone()),
            };
            return Err(EarlyFailure::new(format!("Could not serve folder {}", dir), error));
        }

        // Starting
        resources.process = start_if_configured(config.start.as_deref()).map_err(|e| {
            EarlyFailure::new(
                format!("Could not start {}", config.start.as_deref().unwrap_or_default()),
                e,
            )
        })?;

        // Polling
        if let Some(wait_on) = &config.wait_on {
            info!(
                "waiting on \"{}\" with timeout of {} seconds",
                wait_on.url,
                wait_on.timeout.as_secs_f64()
            );
            let timeout_ms = wait_on.timeout.as_millis();
            let request = PollRequest::new(&wait_on.url, wait_on.timeout).map_err(|e| {
                EarlyFailure::new(format!("Pinging {} for {} failed", wait_on.url, timeout_ms), e)
            })?;

            match self.pinger.poll(&request).await {
                PollOutcome::Ready { elapsed, attempts } => {
                    debug!(
                        "url {} responds after {} ms ({} attempts)",
                        wait_on.url,
                        elapsed.as_millis(),
                        attempts
                    );
                }
                PollOutcome::Failed { last_error, .. } => {
                    return Err(EarlyFailure::new(
                        format!("Pinging {} for {} failed", wait_on.url, timeout_ms),
                        E2eError::ReadinessTimeout {
                            url: wait_on.url.clone(),
                            timeout: wait_on.timeout,
                            last_error: last_error.to_string(),
                        },
                    ));
                }
            }
        }

        // Serving
        let mut served_url = None;
        if config.serves_publish_dir() {
            let server = serve_folder(&env.publish_dir, self.server_port, config.spa.as_deref())
                .await
                .map_err(|source| {
                    let dir = env.publish_dir.display().to_string();
                    EarlyFailure::new(
                        format!("Could not serve folder {}", dir),
                        E2eError::Serve { dir, source },
                    )
                })?;
            debug!("local server listening on port {}", server.port());
            served_url = Some(server.base_url());
            resources.server = Some(Box::new(server));
        }

        // Running
        let base_url = match &config.base_url_source {
            BaseUrlSource::WaitOnUrl(url) | BaseUrlSource::DeployedSite(url) => Some(url.clone()),
            BaseUrlSource::LocalServer => Some(
                served_url.unwrap_or_else(|| format!("http://localhost:{}", self.server_port)),
            ),
            BaseUrlSource::RunnerConfig => None,
        };

        let request = RunRequest::for_phase(config, base_url, env);
        debug!("{}: run params {:?}", phase, request);

        match self.runner.run(&request).await {
            Ok(result) => Ok(result),
            Err(e) => {
                // an invocation error is a crash like any other
                error!("{}: runner failed to execute: {}", phase, e);
                Ok(TestRunResult::crashed(e.to_string()))
            }
        }
    }
}
