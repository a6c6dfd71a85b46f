//! Aggregate report model and builder.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use step_runner::IterationResult;
use telemetry_tap::RiskLevel;

/// Mean-usage growth between consecutive runs that counts as degradation.
pub const DEGRADATION_DELTA_PERCENT: f64 = 10.0;

/// The sole artifact handed to reporting collaborators. Field names are
/// stable across versions to allow historical comparison.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AggregateReport {
    pub campaign_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bug_type: Option<String>,
    pub target_url: String,
    pub started_at: String,
    pub finished_at: String,
    pub requested_runs: u32,
    pub total_runs: u32,
    pub successful_runs: u32,
    pub failed_runs: u32,
    /// Set when a fatal session fault ended the campaign before
    /// `requested_runs` iterations completed.
    pub incomplete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal_error: Option<String>,
    pub run_times: Vec<f64>,
    /// Peak usage percentage per run; `None` where a run captured no
    /// memory samples.
    pub peak_usage_by_run: Vec<Option<f64>>,
    pub summary: RunSummary,
    pub degradation_events: Vec<DegradationEvent>,
    pub iterations: Vec<IterationResult>,
}

/// Cross-run statistics needed by reporting collaborators.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub success_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_run_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_run_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_run_time: Option<f64>,
    pub console_errors: usize,
    pub console_warnings: usize,
    pub network_failures: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_memory_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_memory_percent: Option<f64>,
    pub high_risk_samples: usize,
    pub medium_risk_samples: usize,
    pub low_risk_samples: usize,
}

/// Mean heap usage rose by more than [`DEGRADATION_DELTA_PERCENT`] points
/// between two consecutive runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DegradationEvent {
    pub run: u32,
    pub previous_mean_percent: f64,
    pub current_mean_percent: f64,
    pub increase_percent: f64,
}

/// Append-only builder, exclusively owned by the run aggregator for the
/// duration of the campaign.
pub(crate) struct ReportBuilder {
    campaign_id: String,
    bug_type: Option<String>,
    target_url: String,
    requested_runs: u32,
    started_at: DateTime<Utc>,
    iterations: Vec<IterationResult>,
}

impl ReportBuilder {
    pub(crate) fn new(
        campaign_id: String,
        bug_type: Option<String>,
        target_url: String,
        requested_runs: u32,
    ) -> Self {
        Self {
            campaign_id,
            bug_type,
            target_url,
            requested_runs,
            started_at: Utc::now(),
            iterations: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, result: IterationResult) {
        self.iterations.push(result);
    }

    pub(crate) fn completed_runs(&self) -> u32 {
        self.iterations.len() as u32
    }

    /// Freezes the report. `fatal_error` marks the campaign incomplete.
    pub(crate) fn finish(self, fatal_error: Option<String>) -> AggregateReport {
        let total_runs = self.iterations.len() as u32;
        let successful_runs = self.iterations.iter().filter(|r| r.is_success()).count() as u32;
        let failed_runs = total_runs - successful_runs;

        let run_times: Vec<f64> = self.iterations.iter().map(|r| r.duration_secs).collect();
        let peak_usage_by_run: Vec<Option<f64>> = self
            .iterations
            .iter()
            .map(|r| r.peak_usage_percent())
            .collect();

        let summary = summarize(&self.iterations, total_runs, successful_runs, &run_times);
        let degradation_events = detect_degradation(&self.iterations);

        AggregateReport {
            campaign_id: self.campaign_id,
            bug_type: self.bug_type,
            target_url: self.target_url,
            started_at: self.started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            finished_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            requested_runs: self.requested_runs,
            total_runs,
            successful_runs,
            failed_runs,
            incomplete: fatal_error.is_some() || total_runs < self.requested_runs,
            fatal_error,
            run_times,
            peak_usage_by_run,
            summary,
            degradation_events,
            iterations: self.iterations,
        }
    }
}

fn summarize(
    iterations: &[IterationResult],
    total_runs: u32,
    successful_runs: u32,
    run_times: &[f64],
) -> RunSummary {
    let mut summary = RunSummary {
        success_rate: if total_runs > 0 {
            (successful_runs as f64 / total_runs as f64) * 100.0
        } else {
            0.0
        },
        ..RunSummary::default()
    };

    if !run_times.is_empty() {
        summary.mean_run_time = Some(run_times.iter().sum::<f64>() / run_times.len() as f64);
        summary.min_run_time = run_times.iter().copied().reduce(f64::min);
        summary.max_run_time = run_times.iter().copied().reduce(f64::max);
    }

    let mut usage_sum = 0.0;
    let mut usage_count = 0usize;
    for result in iterations {
        summary.console_errors += result.telemetry.console_error_count();
        summary.console_warnings += result.telemetry.console_warning_count();
        summary.network_failures += result.telemetry.network_failure_count();
        for sample in &result.telemetry.memory_samples {
            usage_sum += sample.usage_percent;
            usage_count += 1;
            match sample.risk {
                RiskLevel::High => summary.high_risk_samples += 1,
                RiskLevel::Medium => summary.medium_risk_samples += 1,
                RiskLevel::Low => summary.low_risk_samples += 1,
            }
            summary.peak_memory_percent = Some(
                summary
                    .peak_memory_percent
                    .map_or(sample.usage_percent, |p| p.max(sample.usage_percent)),
            );
        }
    }
    if usage_count > 0 {
        summary.mean_memory_percent = Some(usage_sum / usage_count as f64);
    }

    summary
}

fn detect_degradation(iterations: &[IterationResult]) -> Vec<DegradationEvent> {
    let mut events = Vec::new();
    for pair in iterations.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        let (Some(prev_mean), Some(cur_mean)) = (
            previous.telemetry.mean_usage_percent(),
            current.telemetry.mean_usage_percent(),
        ) else {
            continue;
        };
        let increase = cur_mean - prev_mean;
        if increase > DEGRADATION_DELTA_PERCENT {
            events.push(DegradationEvent {
                run: current.index,
                previous_mean_percent: prev_mean,
                current_mean_percent: cur_mean,
                increase_percent: increase,
            });
        }
    }
    events
}
