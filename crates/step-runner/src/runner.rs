use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};

use page_port::PagePort;
use telemetry_tap::IterationTap;
use webstress_core_types::{ErrorKind, ExecPolicy, Step};

use crate::model::IterationResult;

/// The shared page handle stopped being usable; the remaining campaign
/// cannot continue.
#[derive(Clone, Debug, Error)]
#[error("fatal session fault: {0}")]
pub struct SessionFault(pub String);

/// GC nudge issued when heap usage crosses the relief threshold. Uses the
/// explicit hook when the runtime exposes one, otherwise churns allocations
/// to coax a collection.
const HEAP_RELIEF_SCRIPT: &str = "(() => { \
    if (window.gc) { window.gc(); return true; } \
    for (let i = 0; i < 10; i++) { const a = new Array(1000000).fill(0); a.length = 0; } \
    return false; })()";

/// Executes the configured step sequence once per call.
pub struct StepRunner {
    policy: ExecPolicy,
}

impl StepRunner {
    pub fn new(policy: ExecPolicy) -> Self {
        Self { policy }
    }

    /// Runs one iteration. The first step failure halts this iteration
    /// only and is returned inside the result; `Err` is reserved for a
    /// page handle that is no longer usable.
    pub async fn run(
        &self,
        page: &Arc<dyn PagePort>,
        steps: &[Step],
        tap: &IterationTap,
        index: u32,
    ) -> Result<IterationResult, SessionFault> {
        let started = Instant::now();
        tap.sample_memory("iteration_start").await;

        for (pos, step) in steps.iter().enumerate() {
            let step_no = pos + 1;
            info!(
                run = index,
                step = step_no,
                label = %step.label,
                action = step.action.name(),
                "executing step"
            );

            let element = match element_locator::resolve(
                page.as_ref(),
                &step.selector,
                self.policy.resolve_timeout(),
            )
            .await
            {
                Ok(element) => element,
                Err(err) => {
                    return self
                        .settle_failure(page, steps, index, started, step_no, step, err.kind(), err.to_string())
                        .await;
                }
            };

            if let Err(err) = action_exec::apply(
                page.as_ref(),
                &element,
                step.action,
                self.policy.action_timeout(),
            )
            .await
            {
                return self
                    .settle_failure(page, steps, index, started, step_no, step, err.kind(), err.to_string())
                    .await;
            }

            tap.sample_memory(&format!("after_step_{step_no}")).await;
            self.relieve_heap_pressure(page, tap).await;

            if !self.policy.step_settle().is_zero() {
                tokio::time::sleep(self.policy.step_settle()).await;
            }
        }

        tap.sample_memory("iteration_end").await;
        let duration = started.elapsed().as_secs_f64();
        info!(run = index, duration_secs = duration, "iteration succeeded");
        Ok(IterationResult::succeeded(index, duration))
    }

    #[allow(clippy::too_many_arguments)]
    async fn settle_failure(
        &self,
        page: &Arc<dyn PagePort>,
        steps: &[Step],
        index: u32,
        started: Instant,
        step_no: usize,
        step: &Step,
        kind: ErrorKind,
        message: String,
    ) -> Result<IterationResult, SessionFault> {
        if kind.is_fatal() {
            return Err(SessionFault(message));
        }

        warn!(
            run = index,
            step = step_no,
            of = steps.len(),
            %kind,
            %message,
            "step failed, halting this iteration"
        );

        let screenshot = match page
            .screenshot(&format!("run_{index}_step_{step_no}_failure"))
            .await
        {
            Ok(reference) => Some(reference),
            Err(err) => {
                warn!(%err, "failure screenshot unavailable");
                None
            }
        };

        Ok(IterationResult::failed(
            index,
            started.elapsed().as_secs_f64(),
            step.clone(),
            kind,
            message,
            screenshot,
        ))
    }

    /// Best-effort GC nudge once usage crosses the configured threshold.
    async fn relieve_heap_pressure(&self, page: &Arc<dyn PagePort>, tap: &IterationTap) {
        let Some(threshold) = self.policy.heap_relief_percent else {
            return;
        };
        let Some(usage) = tap.latest_usage_percent() else {
            return;
        };
        if usage < threshold {
            return;
        }
        match page.evaluate(HEAP_RELIEF_SCRIPT).await {
            Ok(_) => info!(usage_percent = usage, "heap relief nudge issued"),
            Err(err) => warn!(%err, "heap relief nudge failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_port::scripted::{ClickEffect, ScriptedElement, ScriptedPage};
    use telemetry_tap::{TapFilters, TelemetryTap};
    use webstress_core_types::{Action, SelectorKind, SelectorSpec};

    fn fast_policy() -> ExecPolicy {
        ExecPolicy {
            resolve_timeout_ms: 100,
            action_timeout_ms: 100,
            step_settle_ms: 0,
            iteration_settle_ms: 0,
            heap_relief_percent: None,
        }
    }

    fn click_step(label: &str, test_id: &str) -> Step {
        Step {
            label: label.into(),
            action: Action::Click,
            selector: SelectorSpec {
                kind: SelectorKind::TestId,
                value: test_id.into(),
                base: None,
            },
        }
    }

    fn page_with_buttons(ids: &[&str]) -> Arc<ScriptedPage> {
        let page = ScriptedPage::new();
        for id in ids {
            page.add_element(ScriptedElement::new(*id).with_test_id(*id));
        }
        Arc::new(page)
    }

    #[tokio::test]
    async fn all_steps_succeeding_completes_the_iteration() {
        let scripted = page_with_buttons(&["one", "two"]);
        let page: Arc<dyn PagePort> = scripted.clone();
        let tap = TelemetryTap::new(TapFilters::default()).attach(page.clone());

        let steps = vec![click_step("first", "one"), click_step("second", "two")];
        let result = StepRunner::new(fast_policy())
            .run(&page, &steps, &tap, 1)
            .await
            .unwrap();

        assert!(result.is_success());
        assert!(result.failed_step.is_none());
        assert!(result.duration_secs >= 0.0);
        assert_eq!(scripted.click_log(), vec!["one".to_string(), "two".to_string()]);
    }

    #[tokio::test]
    async fn failure_at_step_three_skips_the_rest() {
        let scripted = page_with_buttons(&["one", "two", "four", "five"]);
        let page: Arc<dyn PagePort> = scripted.clone();
        let tap = TelemetryTap::new(TapFilters::default()).attach(page.clone());

        let steps = vec![
            click_step("first", "one"),
            click_step("second", "two"),
            click_step("third", "three-missing"),
            click_step("fourth", "four"),
            click_step("fifth", "five"),
        ];
        let result = StepRunner::new(fast_policy())
            .run(&page, &steps, &tap, 1)
            .await
            .unwrap();

        assert_eq!(result.status, crate::RunStatus::Failed);
        assert_eq!(result.failed_step.as_ref().unwrap().label, "third");
        assert_eq!(result.error_kind, Some(ErrorKind::ElementNotFound));
        assert!(result.screenshot.is_some());
        // Steps four and five were never attempted.
        assert_eq!(scripted.click_log(), vec!["one".to_string(), "two".to_string()]);
    }

    #[tokio::test]
    async fn session_fault_propagates_instead_of_being_recorded() {
        let scripted = page_with_buttons(&[]);
        scripted.add_element(
            ScriptedElement::new("boom")
                .with_test_id("boom")
                .on_click(ClickEffect::Poison("tab crashed".into())),
        );
        let page: Arc<dyn PagePort> = scripted.clone();
        let tap = TelemetryTap::new(TapFilters::default()).attach(page.clone());

        let steps = vec![click_step("crash", "boom"), click_step("after", "boom")];
        let err = StepRunner::new(fast_policy())
            .run(&page, &steps, &tap, 1)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("tab crashed"));
    }

    #[tokio::test]
    async fn absent_section_and_missing_control_are_distinguishable() {
        fn increment_step(product_id: &str) -> Step {
            Step {
                label: "add a unit".into(),
                action: Action::IncrementQuantity,
                selector: SelectorSpec {
                    kind: SelectorKind::SectionProduct,
                    value: product_id.into(),
                    base: None,
                },
            }
        }

        // The product id matches no section at all.
        let scripted = page_with_buttons(&[]);
        let page: Arc<dyn PagePort> = scripted.clone();
        let tap = TelemetryTap::new(TapFilters::default()).attach(page.clone());
        let result = StepRunner::new(fast_policy())
            .run(&page, &[increment_step("ghost-product")], &tap, 1)
            .await
            .unwrap();
        assert_eq!(result.error_kind, Some(ErrorKind::ElementNotFound));

        // The section exists but carries no increment control.
        let scripted = page_with_buttons(&[]);
        scripted.add_element(ScriptedElement::new("section").with_product_id("workbench-42"));
        let page: Arc<dyn PagePort> = scripted.clone();
        let tap = TelemetryTap::new(TapFilters::default()).attach(page.clone());
        let result = StepRunner::new(fast_policy())
            .run(&page, &[increment_step("workbench-42")], &tap, 1)
            .await
            .unwrap();
        assert_eq!(result.error_kind, Some(ErrorKind::ControlNotFound));
    }

    #[tokio::test]
    async fn heap_relief_fires_past_the_threshold() {
        let scripted = page_with_buttons(&["one"]);
        scripted.set_memory_percent_series(vec![20.0, 85.0, 85.0]);
        let page: Arc<dyn PagePort> = scripted.clone();
        let tap = TelemetryTap::new(TapFilters::default()).attach(page.clone());

        let policy = ExecPolicy {
            heap_relief_percent: Some(70.0),
            ..fast_policy()
        };
        let steps = vec![click_step("first", "one")];
        StepRunner::new(policy)
            .run(&page, &steps, &tap, 1)
            .await
            .unwrap();

        assert_eq!(scripted.evaluation_log().len(), 1);
    }

    #[tokio::test]
    async fn iteration_result_serializes_spec_field_names() {
        let result = IterationResult::succeeded(3, 1.25);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["index"], 3);
        assert_eq!(value["status"], "succeeded");
        assert!(value["console_entries"].is_array());
        assert!(value["network_entries"].is_array());
        assert!(value["memory_samples"].is_array());
    }
}
