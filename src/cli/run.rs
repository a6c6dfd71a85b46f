use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use campaign_runner::{Campaign, CampaignOptions};
use page_port::scripted::{PageFixture, ScriptedSession};

use crate::config::{load_campaign_config, load_step_path};

use super::output;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Campaign config (YAML)
    #[arg(short = 'c', long)]
    pub config: PathBuf,

    /// Test path (JSON step sequence)
    #[arg(short = 'p', long)]
    pub path: PathBuf,

    /// Iteration count; defaults to the config's default_iterations
    #[arg(short = 'i', long)]
    pub iterations: Option<u32>,

    /// Scripted session fixture (JSON) standing in for a live browser
    /// session. Production adapters implement the page port out of tree.
    #[arg(long)]
    pub fixture: PathBuf,
}

pub async fn cmd_run(args: RunArgs) -> Result<()> {
    let config = load_campaign_config(&args.config)?;
    let step_path = load_step_path(&args.path)?;

    let mut iterations = args.iterations.unwrap_or(config.default_iterations);
    if iterations > config.max_iterations {
        warn!(
            requested = iterations,
            max = config.max_iterations,
            "requested iterations exceed the configured maximum, clamping"
        );
        iterations = config.max_iterations;
    }

    let options = CampaignOptions {
        bug_type: step_path.bug_type.clone(),
        policy: config.policy.clone(),
        filters: config.filters.clone(),
        artifacts_dir: config.artifacts_dir.clone(),
    };
    let campaign = Campaign::new(step_path.steps, iterations, &config.target_url, options)
        .context("campaign configuration rejected")?;

    let raw = std::fs::read_to_string(&args.fixture)
        .with_context(|| format!("reading fixture {}", args.fixture.display()))?;
    let fixture: PageFixture = serde_json::from_str(&raw)
        .with_context(|| format!("parsing fixture {}", args.fixture.display()))?;
    let session = ScriptedSession::new(fixture.build());

    if let Some(description) = &step_path.description {
        info!(%description, "test path loaded");
    }

    let report = campaign.execute(&session).await?;
    output::print_summary(&report);
    Ok(())
}
