//! Sitegate CLI - Main Entry Point

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use sitegate_cli::commands::{phase, ping};
use sitegate_cli::output::OutputFormat;
use sitegate_common::{default_inputs_path, Phase, VERSION};

/// Sitegate - end-to-end test gate for site builds and deploys
#[derive(Parser, Debug)]
#[command(name = "sitegate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Plugin inputs file
    #[arg(long, env = "SITEGATE_CONFIG", default_value_os_t = default_inputs_path(), global = true)]
    config: PathBuf,

    /// Output format for status summaries
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prepare Cypress, then run the preBuild tests
    PreBuild(phase::PhaseArgs),

    /// Run the postBuild tests against the publish folder or a started app
    PostBuild(phase::PhaseArgs),

    /// Run the onSuccess tests against the deployed site
    OnSuccess(phase::PhaseArgs),

    /// Run all three phases in order, stopping at the first failure
    RunAll(phase::PhaseArgs),

    /// Wait until a URL responds
    Ping(ping::PingArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match cli.command {
        Commands::PreBuild(args) => {
            phase::execute(&[Phase::PreBuild], &cli.config, args, cli.format).await?
        }
        Commands::PostBuild(args) => {
            phase::execute(&[Phase::PostBuild], &cli.config, args, cli.format).await?
        }
        Commands::OnSuccess(args) => {
            phase::execute(&[Phase::OnSuccess], &cli.config, args, cli.format).await?
        }
        Commands::RunAll(args) => phase::execute(&Phase::ALL, &cli.config, args, cli.format).await?,
        Commands::Ping(args) => ping::execute(args).await?,
        Commands::Version => {
            println!("sitegate v{}", VERSION);
            0
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
