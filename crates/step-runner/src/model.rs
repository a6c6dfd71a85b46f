use serde::{Deserialize, Serialize};

use telemetry_tap::TelemetryRecord;
use webstress_core_types::{ErrorKind, Step};

/// Terminal state of one iteration.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

/// Frozen outcome of one iteration, owned by the aggregator afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IterationResult {
    /// 1-based iteration number.
    pub index: u32,
    pub status: RunStatus,
    pub duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<Step>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(flatten)]
    pub telemetry: TelemetryRecord,
}

impl IterationResult {
    pub(crate) fn succeeded(index: u32, duration_secs: f64) -> Self {
        Self {
            index,
            status: RunStatus::Succeeded,
            duration_secs,
            failed_step: None,
            error_kind: None,
            failure_message: None,
            screenshot: None,
            telemetry: TelemetryRecord::default(),
        }
    }

    pub(crate) fn failed(
        index: u32,
        duration_secs: f64,
        step: Step,
        kind: ErrorKind,
        message: String,
        screenshot: Option<String>,
    ) -> Self {
        Self {
            index,
            status: RunStatus::Failed,
            duration_secs,
            failed_step: Some(step),
            error_kind: Some(kind),
            failure_message: Some(message),
            screenshot,
            telemetry: TelemetryRecord::default(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Attaches the frozen telemetry once the collector detaches.
    pub fn with_telemetry(mut self, telemetry: TelemetryRecord) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn peak_usage_percent(&self) -> Option<f64> {
        self.telemetry.peak_usage_percent()
    }
}
