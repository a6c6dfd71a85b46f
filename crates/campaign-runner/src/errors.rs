use thiserror::Error;

use webstress_core_types::ConfigViolation;

/// Campaign-level failures.
///
/// Step-level failures never surface here; they live inside the report.
/// Even a fatal session fault is returned as data (the partial report),
/// not as an error.
#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigViolation),
    #[error("artifact persistence failed: {0}")]
    Artifact(String),
}
