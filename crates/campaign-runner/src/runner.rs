use std::path::PathBuf;

use tracing::{error, info, warn};

use page_port::SessionFactory;
use step_runner::StepRunner;
use telemetry_tap::{TapFilters, TelemetryTap};
use webstress_core_types::{CampaignId, ConfigViolation, ExecPolicy, Step};

use crate::artifacts;
use crate::errors::CampaignError;
use crate::report::{AggregateReport, ReportBuilder};

/// Collaborator-supplied knobs for one campaign.
#[derive(Clone, Debug, Default)]
pub struct CampaignOptions {
    pub bug_type: Option<String>,
    pub policy: ExecPolicy,
    pub filters: TapFilters,
    /// Where to persist the JSON artifact; `None` skips persistence.
    pub artifacts_dir: Option<PathBuf>,
}

/// One configured campaign: the full set of iterations requested for a
/// single invocation.
pub struct Campaign {
    id: CampaignId,
    steps: Vec<Step>,
    iteration_count: u32,
    target_url: String,
    options: CampaignOptions,
}

impl Campaign {
    /// Fails fast with a configuration error before any iteration runs.
    pub fn new(
        steps: Vec<Step>,
        iteration_count: u32,
        target_url: impl Into<String>,
        options: CampaignOptions,
    ) -> Result<Self, CampaignError> {
        if iteration_count < 1 {
            return Err(ConfigViolation::BadIterationCount {
                got: iteration_count,
            }
            .into());
        }
        if steps.is_empty() {
            return Err(ConfigViolation::NoSteps.into());
        }
        for step in &steps {
            step.validate()?;
        }
        Ok(Self {
            id: CampaignId::new(),
            steps,
            iteration_count,
            target_url: target_url.into(),
            options,
        })
    }

    pub fn id(&self) -> &CampaignId {
        &self.id
    }

    /// Runs the campaign to completion.
    ///
    /// Iterations execute strictly sequentially against one page handle
    /// reused across the whole campaign, so session state and memory
    /// pressure accumulate the way sustained real-world usage does. The
    /// returned report is complete, or partial and flagged incomplete
    /// after a fatal session fault.
    pub async fn execute(
        &self,
        factory: &dyn SessionFactory,
    ) -> Result<AggregateReport, CampaignError> {
        let mut builder = ReportBuilder::new(
            self.id.0.clone(),
            self.options.bug_type.clone(),
            self.target_url.clone(),
            self.iteration_count,
        );

        info!(
            campaign = %self.id.0,
            iterations = self.iteration_count,
            steps = self.steps.len(),
            url = %self.target_url,
            "starting campaign"
        );

        let page = match factory.new_page().await {
            Ok(page) => page,
            Err(err) => {
                error!(%err, "could not obtain a page handle");
                return self.seal(builder.finish(Some(err.to_string())));
            }
        };

        let runner = StepRunner::new(self.options.policy.clone());
        let tapper = TelemetryTap::new(self.options.filters.clone());
        let mut fatal: Option<String> = None;

        for index in 1..=self.iteration_count {
            info!(run = index, of = self.iteration_count, "starting iteration");

            // Attach before navigating so load-time console and network
            // activity lands in this iteration's record.
            let tap = tapper.attach(page.clone());

            if let Err(err) = page.navigate(&self.target_url).await {
                // The shared page cannot load the target any more; nothing
                // later in the campaign can succeed.
                error!(run = index, %err, "navigation failed, ending campaign");
                fatal = Some(err.to_string());
                break;
            }
            let mut result = match runner.run(&page, &self.steps, &tap, index).await {
                Ok(result) => result,
                Err(fault) => {
                    error!(run = index, %fault, "iteration hit a fatal session fault");
                    fatal = Some(fault.to_string());
                    break;
                }
            };

            if result.screenshot.is_none() {
                match page.screenshot(&format!("run_{index}_final_state")).await {
                    Ok(reference) => result.screenshot = Some(reference),
                    Err(err) => warn!(run = index, %err, "final-state screenshot unavailable"),
                }
            }

            let result = result.with_telemetry(tap.finish());
            if result.is_success() {
                info!(run = index, "iteration succeeded");
            } else {
                warn!(run = index, "iteration failed");
            }
            builder.push(result);

            if index < self.iteration_count && !self.options.policy.iteration_settle().is_zero() {
                tokio::time::sleep(self.options.policy.iteration_settle()).await;
            }
        }

        if let Err(err) = factory.close().await {
            warn!(%err, "session close reported an error");
        }

        if let Some(reason) = &fatal {
            warn!(
                completed = builder.completed_runs(),
                requested = self.iteration_count,
                %reason,
                "campaign ended early"
            );
        }
        self.seal(builder.finish(fatal))
    }

    fn seal(&self, report: AggregateReport) -> Result<AggregateReport, CampaignError> {
        if let Some(dir) = &self.options.artifacts_dir {
            let path = artifacts::write_report(dir, &report)?;
            info!(path = %path.display(), "campaign artifact persisted");
        }
        info!(
            total = report.total_runs,
            successful = report.successful_runs,
            failed = report.failed_runs,
            incomplete = report.incomplete,
            "campaign finished"
        );
        Ok(report)
    }
}
