//! JSON artifact persistence for reporting collaborators.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::errors::CampaignError;
use crate::report::AggregateReport;

/// Writes one serialized record for the campaign and returns its path.
pub fn write_report(dir: &Path, report: &AggregateReport) -> Result<PathBuf, CampaignError> {
    fs::create_dir_all(dir)
        .map_err(|err| CampaignError::Artifact(format!("create {}: {err}", dir.display())))?;

    let slug = report
        .bug_type
        .as_deref()
        .unwrap_or("campaign")
        .replace(|c: char| !c.is_ascii_alphanumeric() && c != '-' && c != '_', "_");
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("campaign_{slug}_{stamp}.json"));

    let json = serde_json::to_string_pretty(report)
        .map_err(|err| CampaignError::Artifact(format!("serialize report: {err}")))?;
    fs::write(&path, json)
        .map_err(|err| CampaignError::Artifact(format!("write {}: {err}", path.display())))?;

    Ok(path)
}
