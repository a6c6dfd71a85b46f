use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use campaign_runner::{Campaign, CampaignOptions};

use crate::config::{load_campaign_config, load_step_path};

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Campaign config (YAML)
    #[arg(short = 'c', long)]
    pub config: PathBuf,

    /// Test path (JSON step sequence)
    #[arg(short = 'p', long)]
    pub path: PathBuf,
}

pub fn cmd_validate(args: ValidateArgs) -> Result<()> {
    let config = load_campaign_config(&args.config)?;
    let step_path = load_step_path(&args.path)?;
    let step_count = step_path.steps.len();

    let options = CampaignOptions {
        bug_type: step_path.bug_type.clone(),
        policy: config.policy.clone(),
        filters: config.filters.clone(),
        artifacts_dir: None,
    };
    Campaign::new(
        step_path.steps,
        config.default_iterations,
        &config.target_url,
        options,
    )
    .context("campaign configuration rejected")?;

    println!(
        "OK: {} steps against {} ({} default iterations)",
        step_count, config.target_url, config.default_iterations
    );
    Ok(())
}
