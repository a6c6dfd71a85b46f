use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use super::{paths, validate};

#[derive(Parser)]
#[command(
    name = "webstress",
    version,
    about = "Repeatedly drives a web application through a configured UI path to surface intermittent client-side failures"
)]
pub struct Cli {
    /// Log level when RUST_LOG is not set (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a campaign against a scripted session fixture
    Run(super::run::RunArgs),
    /// List the test paths available in a directory
    Paths(paths::PathsArgs),
    /// Validate a campaign config and test path without running anything
    Validate(validate::ValidateArgs),
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    info!("webstress v{}", env!("CARGO_PKG_VERSION"));

    let outcome = match cli.command {
        Commands::Run(args) => super::run::cmd_run(args).await,
        Commands::Paths(args) => paths::cmd_paths(args),
        Commands::Validate(args) => validate::cmd_validate(args),
    };

    if let Err(err) = &outcome {
        error!("command failed: {err:#}");
    }
    outcome
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("logging init failed: {err}"))
}
