//! Plain-text campaign summary for the terminal.

use campaign_runner::AggregateReport;

pub fn print_summary(report: &AggregateReport) {
    let line = "=".repeat(60);
    println!("\n{line}");
    println!("CAMPAIGN SUMMARY");
    println!("{line}");
    println!("Target URL:      {}", report.target_url);
    if let Some(bug_type) = &report.bug_type {
        println!("Bug type:        {bug_type}");
    }
    println!(
        "Runs:            {} of {} requested ({} ok, {} failed)",
        report.total_runs, report.requested_runs, report.successful_runs, report.failed_runs
    );
    println!("Success rate:    {:.1}%", report.summary.success_rate);

    if let (Some(mean), Some(min), Some(max)) = (
        report.summary.mean_run_time,
        report.summary.min_run_time,
        report.summary.max_run_time,
    ) {
        println!("Run time:        mean {mean:.2}s, fastest {min:.2}s, slowest {max:.2}s");
    }

    println!(
        "Console:         {} errors, {} warnings (relevant only)",
        report.summary.console_errors, report.summary.console_warnings
    );
    println!("Network:         {} failures", report.summary.network_failures);

    if let Some(peak) = report.summary.peak_memory_percent {
        println!(
            "Memory:          peak {:.1}%, mean {:.1}% ({} high / {} medium / {} low risk samples)",
            peak,
            report.summary.mean_memory_percent.unwrap_or(0.0),
            report.summary.high_risk_samples,
            report.summary.medium_risk_samples,
            report.summary.low_risk_samples
        );
    } else {
        println!("Memory:          no samples captured");
    }

    if !report.degradation_events.is_empty() {
        println!(
            "Degradation:     {} event(s) detected",
            report.degradation_events.len()
        );
        for event in &report.degradation_events {
            println!(
                "  run {}: mean usage {:.1}% -> {:.1}% (+{:.1})",
                event.run,
                event.previous_mean_percent,
                event.current_mean_percent,
                event.increase_percent
            );
        }
    }

    for iteration in report.iterations.iter().filter(|i| !i.is_success()) {
        let step = iteration
            .failed_step
            .as_ref()
            .map(|s| s.label.as_str())
            .unwrap_or("?");
        let kind = iteration
            .error_kind
            .map(|k| k.to_string())
            .unwrap_or_default();
        println!("  run {} failed at '{step}': {kind}", iteration.index);
    }

    if report.incomplete {
        println!(
            "INCOMPLETE:      campaign ended after {} of {} runs{}",
            report.total_runs,
            report.requested_runs,
            report
                .fatal_error
                .as_deref()
                .map(|e| format!(" ({e})"))
                .unwrap_or_default()
        );
    }
    println!("{line}");
}
