//! Phase commands: `pre-build`, `post-build`, `on-success` and `run-all`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use tracing::{debug, info};

use sitegate_common::{BuildEnv, Phase, PluginInputs};
use sitegate_e2e::{CypressRunner, Orchestrator, PhaseOutcome, Pinger, Verdict, DEFAULT_PORT};

use crate::host::ConsoleHost;
use crate::output::{self, OutputFormat};

#[derive(Args, Debug, Clone)]
pub struct PhaseArgs {
    /// Directory holding the Cypress project and its node_modules
    #[arg(long, default_value = ".")]
    pub project_dir: PathBuf,

    /// Publish folder to serve (defaults to $PUBLISH_DIR)
    #[arg(long)]
    pub publish_dir: Option<PathBuf>,

    /// Port for the local static server
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Node executable running the Cypress module API
    #[arg(long, env = "SITEGATE_NODE", default_value = "node")]
    pub node: PathBuf,

    /// npx executable used to install and verify Cypress
    #[arg(long, env = "SITEGATE_NPX", default_value = "npx")]
    pub npx: PathBuf,
}

/// Run `phases` in order, stopping after the first failing one
///
/// Returns the process exit code.
pub async fn execute(
    phases: &[Phase],
    config: &Path,
    args: PhaseArgs,
    format: OutputFormat,
) -> anyhow::Result<i32> {
    let inputs = PluginInputs::load(config)
        .with_context(|| format!("Failed to load inputs from {}", config.display()))?;

    let mut env = BuildEnv::from_env();
    if let Some(dir) = args.publish_dir {
        env.publish_dir = dir;
    }
    debug!("build environment {:?}", env);

    let runner = CypressRunner::new(&args.project_dir)
        .with_node(&args.node)
        .with_npx(&args.npx);
    let orchestrator =
        Orchestrator::new(Arc::new(runner), Pinger::new()?).with_server_port(args.port);
    let host = ConsoleHost::new(format);

    for &phase in phases {
        info!("{}: starting", phase);
        let phase_inputs = inputs.for_phase(phase);
        let outcome = match phase {
            Phase::PreBuild => orchestrator.pre_build(phase_inputs, &env, &host).await,
            Phase::PostBuild => orchestrator.post_build(phase_inputs, &env, &host).await,
            Phase::OnSuccess => orchestrator.on_success(phase_inputs, &env, &host).await,
        }
        .with_context(|| format!("{} did not shut down cleanly", phase))?;

        report_outcome(phase, &outcome);
        if outcome.is_failure() {
            break;
        }
    }

    Ok(host.exit_code())
}

/// Failures were already printed by the host
fn report_outcome(phase: Phase, outcome: &PhaseOutcome) {
    match outcome {
        PhaseOutcome::Skipped => output::print_info(&format!("{}: not enabled, skipped", phase)),
        PhaseOutcome::Completed(Verdict::Passed) => {
            output::print_success(&format!("{}: all tests passed", phase))
        }
        PhaseOutcome::Completed(_) | PhaseOutcome::Failed { .. } => {
            debug!("{}: {:?}", phase, outcome)
        }
    }
}
