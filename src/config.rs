//! Campaign configuration and test-path loading.
//!
//! A campaign is configured by two files: a YAML config carrying the
//! target URL, timing policy, telemetry filters and artifact location,
//! and a JSON test path carrying the ordered step sequence. Structural
//! validation happens at campaign construction; this module only gets the
//! bytes into typed form.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use telemetry_tap::TapFilters;
use webstress_core_types::{ExecPolicy, Step};

fn default_iterations() -> u32 {
    5
}

fn default_max_iterations() -> u32 {
    50
}

/// YAML campaign configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub target_url: String,
    #[serde(default = "default_iterations")]
    pub default_iterations: u32,
    /// Upper bound on requested iterations; larger requests are clamped.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default)]
    pub policy: ExecPolicy,
    #[serde(default)]
    pub filters: TapFilters,
    #[serde(default)]
    pub artifacts_dir: Option<PathBuf>,
}

/// JSON test path. The detailed form carries the bug context; a bare
/// array of steps is also accepted, matching older path files.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepPath {
    #[serde(default)]
    pub bug_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expected_behavior: Option<String>,
    pub steps: Vec<Step>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StepPathFile {
    Bare(Vec<Step>),
    Detailed(StepPath),
}

pub fn load_campaign_config(path: &Path) -> Result<CampaignConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading campaign config {}", path.display()))?;
    serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing campaign config {}", path.display()))
}

pub fn load_step_path(path: &Path) -> Result<StepPath> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading test path {}", path.display()))?;
    let file: StepPathFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing test path {}", path.display()))?;
    Ok(match file {
        StepPathFile::Bare(steps) => StepPath {
            bug_type: None,
            description: None,
            expected_behavior: None,
            steps,
        },
        StepPathFile::Detailed(step_path) => step_path,
    })
}
