use std::sync::Arc;

use campaign_runner::{Campaign, CampaignError, CampaignOptions};
use page_port::scripted::{ScriptedElement, ScriptedPage, ScriptedSession};
use telemetry_tap::RiskLevel;
use webstress_core_types::{
    Action, ConfigViolation, ExecPolicy, SelectorKind, SelectorSpec, Step,
};

const TARGET_URL: &str = "https://example.test/builder";

fn fast_options() -> CampaignOptions {
    CampaignOptions {
        bug_type: Some("export_bug".into()),
        policy: ExecPolicy {
            resolve_timeout_ms: 100,
            action_timeout_ms: 100,
            step_settle_ms: 0,
            iteration_settle_ms: 0,
            heap_relief_percent: None,
        },
        ..CampaignOptions::default()
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

fn session_with_button() -> (Arc<ScriptedPage>, ScriptedSession) {
    let page = Arc::new(ScriptedPage::new());
    page.add_element(ScriptedElement::new("export").with_test_id("export-button"));
    let session = ScriptedSession::new(page.clone());
    (page, session)
}

#[tokio::test]
async fn five_clean_iterations_all_succeed() {
    let (page, session) = session_with_button();
    let campaign = Campaign::new(
        vec![click_step("export", "export-button")],
        5,
        TARGET_URL,
        fast_options(),
    )
    .unwrap();

    let report = campaign.execute(&session).await.unwrap();

    assert_eq!(report.requested_runs, 5);
    assert_eq!(report.total_runs, 5);
    assert_eq!(report.successful_runs, 5);
    assert_eq!(report.failed_runs, 0);
    assert_eq!(
        report.total_runs,
        report.successful_runs + report.failed_runs
    );
    assert_eq!(report.iterations.len() as u32, report.total_runs);
    assert_eq!(report.run_times.len(), 5);
    assert!(!report.incomplete);
    assert!(report.fatal_error.is_none());
    assert_eq!(page.navigation_log().len(), 5);
    assert!((report.summary.success_rate - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn failing_iterations_never_abort_the_loop() {
    let (_page, session) = session_with_button();
    let campaign = Campaign::new(
        vec![
            click_step("export", "export-button"),
            click_step("confirm", "missing-dialog"),
        ],
        3,
        TARGET_URL,
        fast_options(),
    )
    .unwrap();

    let report = campaign.execute(&session).await.unwrap();

    assert_eq!(report.total_runs, 3);
    assert_eq!(report.successful_runs, 0);
    assert_eq!(report.failed_runs, 3);
    assert!(!report.incomplete);
    for iteration in &report.iterations {
        assert_eq!(
            iteration.failed_step.as_ref().unwrap().label,
            "confirm"
        );
        assert!(iteration.screenshot.is_some());
    }
}

#[tokio::test]
async fn fatal_session_fault_returns_partial_report() {
    let (page, session) = session_with_button();
    page.set_navigation_budget(3);

    let campaign = Campaign::new(
        vec![click_step("export", "export-button")],
        10,
        TARGET_URL,
        fast_options(),
    )
    .unwrap();

    let report = campaign.execute(&session).await.unwrap();

    assert_eq!(report.requested_runs, 10);
    assert_eq!(report.total_runs, 3);
    assert_eq!(report.successful_runs, 3);
    assert!(report.incomplete);
    assert!(report.fatal_error.is_some());
    assert_eq!(
        report.total_runs,
        report.successful_runs + report.failed_runs
    );
}

#[tokio::test]
async fn peak_usage_tracks_the_risk_sequence() {
    let (page, session) = session_with_button();
    // One step: checkpoints are iteration_start, after_step_1, iteration_end.
    page.set_memory_percent_series(vec![10.0, 40.0, 55.0]);

    let campaign = Campaign::new(
        vec![click_step("export", "export-button")],
        1,
        TARGET_URL,
        fast_options(),
    )
    .unwrap();

    let report = campaign.execute(&session).await.unwrap();

    let peak = report.peak_usage_by_run[0].unwrap();
    assert!((peak - 55.0).abs() < 0.01);

    let risks: Vec<RiskLevel> = report.iterations[0]
        .telemetry
        .memory_samples
        .iter()
        .map(|s| s.risk)
        .collect();
    assert_eq!(risks, vec![RiskLevel::Low, RiskLevel::Medium, RiskLevel::High]);
    assert_eq!(report.summary.high_risk_samples, 1);
    assert_eq!(report.summary.medium_risk_samples, 1);
    assert_eq!(report.summary.low_risk_samples, 1);
}

#[tokio::test]
async fn runs_without_samples_have_absent_peaks() {
    let (_page, session) = session_with_button();
    let campaign = Campaign::new(
        vec![click_step("export", "export-button")],
        2,
        TARGET_URL,
        fast_options(),
    )
    .unwrap();

    let report = campaign.execute(&session).await.unwrap();
    assert_eq!(report.peak_usage_by_run, vec![None, None]);
    assert_eq!(report.summary.peak_memory_percent, None);
}

#[tokio::test]
async fn degradation_fires_on_a_ten_point_mean_increase() {
    let (page, session) = session_with_button();
    // Run 1 averages 10%, run 2 averages 25%: a 15-point climb.
    page.set_memory_percent_series(vec![10.0, 10.0, 10.0, 25.0, 25.0, 25.0]);

    let campaign = Campaign::new(
        vec![click_step("export", "export-button")],
        2,
        TARGET_URL,
        fast_options(),
    )
    .unwrap();

    let report = campaign.execute(&session).await.unwrap();
    assert_eq!(report.degradation_events.len(), 1);
    let event = &report.degradation_events[0];
    assert_eq!(event.run, 2);
    assert!((event.increase_percent - 15.0).abs() < 0.01);
}

#[tokio::test]
async fn artifact_round_trips_with_stable_field_names() {
    let dir = tempfile::tempdir().unwrap();
    let (_page, session) = session_with_button();

    let mut options = fast_options();
    options.artifacts_dir = Some(dir.path().to_path_buf());
    let campaign = Campaign::new(
        vec![click_step("export", "export-button")],
        2,
        TARGET_URL,
        options,
    )
    .unwrap();

    campaign.execute(&session).await.unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("campaign_export_bug_"));

    let raw = std::fs::read_to_string(&entries[0]).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["total_runs"], 2);
    assert_eq!(value["successful_runs"], 2);
    assert_eq!(value["failed_runs"], 0);
    assert!(value["run_times"].is_array());
    assert!(value["peak_usage_by_run"].is_array());
    assert!(value["iterations"][0]["console_entries"].is_array());

    let parsed: campaign_runner::AggregateReport = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed.total_runs, 2);
}

#[tokio::test]
async fn configuration_errors_fail_before_any_iteration() {
    let zero_iterations = Campaign::new(
        vec![click_step("export", "export-button")],
        0,
        TARGET_URL,
        CampaignOptions::default(),
    );
    assert!(matches!(
        zero_iterations,
        Err(CampaignError::Config(ConfigViolation::BadIterationCount { got: 0 }))
    ));

    let no_steps = Campaign::new(Vec::new(), 3, TARGET_URL, CampaignOptions::default());
    assert!(matches!(
        no_steps,
        Err(CampaignError::Config(ConfigViolation::NoSteps))
    ));

    let stray_base = Campaign::new(
        vec![Step {
            label: "bad".into(),
            action: Action::Click,
            selector: SelectorSpec {
                kind: SelectorKind::Composite,
                value: "div.card".into(),
                base: Some("button".into()),
            },
        }],
        3,
        TARGET_URL,
        CampaignOptions::default(),
    );
    assert!(matches!(
        stray_base,
        Err(CampaignError::Config(ConfigViolation::BaseOnNonText { .. }))
    ));
}
