//! Per-iteration telemetry collection.
//!
//! An [`IterationTap`] attaches to a page for the lifetime of one
//! iteration: it subscribes to the page's event bus, classifies console
//! entries against the injected relevance filter, retains network entries
//! matching the domain filter, and samples heap usage at the fixed
//! checkpoints (iteration start, after each step, iteration end). The
//! event subscription is drained at every checkpoint and once more at
//! `finish`, keeping collection deterministic under the strictly
//! sequential execution model.

pub mod config;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use page_port::{ConsoleLevel, MemoryProbe, PageEvent, PagePort};

pub use config::TapFilters;

/// Usage percentage at and above which a sample is high risk.
pub const HIGH_RISK_PERCENT: f64 = 50.0;

/// Usage percentage at and above which a sample is medium risk.
pub const MEDIUM_RISK_PERCENT: f64 = 35.0;

/// Signal-vs-noise classification of a console entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relevance {
    Relevant,
    Noise,
}

/// Memory-pressure classification against the global thresholds.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Boundary-exact: `high ⇔ usage ≥ 50`, `medium ⇔ 35 ≤ usage < 50`.
    pub fn classify(usage_percent: f64) -> Self {
        if usage_percent >= HIGH_RISK_PERCENT {
            RiskLevel::High
        } else if usage_percent >= MEDIUM_RISK_PERCENT {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// One captured console message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: ConsoleLevel,
    pub text: String,
    pub relevance: Relevance,
    pub timestamp: f64,
}

/// One captured network exchange.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkEntry {
    pub url: String,
    pub status: Option<u16>,
    pub failed: bool,
    pub timestamp: f64,
}

/// One heap-usage sample taken at a fixed checkpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemorySample {
    pub used_bytes: u64,
    pub limit_bytes: u64,
    pub usage_percent: f64,
    pub risk: RiskLevel,
    pub checkpoint: String,
}

impl MemorySample {
    pub fn from_probe(probe: MemoryProbe, checkpoint: &str) -> Self {
        let usage_percent = if probe.limit_bytes > 0 {
            (probe.used_bytes as f64 / probe.limit_bytes as f64) * 100.0
        } else {
            0.0
        };
        Self {
            used_bytes: probe.used_bytes,
            limit_bytes: probe.limit_bytes,
            usage_percent,
            risk: RiskLevel::classify(usage_percent),
            checkpoint: checkpoint.to_string(),
        }
    }
}

/// Frozen telemetry of one finished iteration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub console_entries: Vec<LogEntry>,
    pub network_entries: Vec<NetworkEntry>,
    pub memory_samples: Vec<MemorySample>,
}

impl TelemetryRecord {
    /// Relevant error-level console entries; noise is retained in the
    /// record but never counted here.
    pub fn console_error_count(&self) -> usize {
        self.console_entries
            .iter()
            .filter(|e| e.level == ConsoleLevel::Error && e.relevance == Relevance::Relevant)
            .count()
    }

    pub fn console_warning_count(&self) -> usize {
        self.console_entries
            .iter()
            .filter(|e| e.level == ConsoleLevel::Warning && e.relevance == Relevance::Relevant)
            .count()
    }

    pub fn network_failure_count(&self) -> usize {
        self.network_entries.iter().filter(|e| e.failed).count()
    }

    pub fn peak_usage_percent(&self) -> Option<f64> {
        self.memory_samples
            .iter()
            .map(|s| s.usage_percent)
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
    }

    pub fn mean_usage_percent(&self) -> Option<f64> {
        if self.memory_samples.is_empty() {
            return None;
        }
        let sum: f64 = self.memory_samples.iter().map(|s| s.usage_percent).sum();
        Some(sum / self.memory_samples.len() as f64)
    }
}

/// Collector factory carrying the injected filters.
#[derive(Clone, Debug, Default)]
pub struct TelemetryTap {
    filters: TapFilters,
}

impl TelemetryTap {
    pub fn new(filters: TapFilters) -> Self {
        Self { filters }
    }

    /// Attaches to the page for one iteration.
    pub fn attach(&self, page: Arc<dyn PagePort>) -> IterationTap {
        IterationTap {
            rx: Mutex::new(page.events()),
            page,
            filters: self.filters.clone(),
            buffers: Mutex::new(TelemetryRecord::default()),
        }
    }
}

/// Live collector bound to one page for one iteration.
pub struct IterationTap {
    page: Arc<dyn PagePort>,
    rx: Mutex<broadcast::Receiver<PageEvent>>,
    filters: TapFilters,
    buffers: Mutex<TelemetryRecord>,
}

impl IterationTap {
    /// Drains every event queued on the subscription since the last drain.
    pub fn pump(&self) {
        let mut rx = self.rx.lock();
        loop {
            match rx.try_recv() {
                Ok(event) => self.ingest(event),
                Err(broadcast::error::TryRecvError::Empty) => break,
                Err(broadcast::error::TryRecvError::Closed) => break,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "telemetry subscription lagged, entries lost");
                }
            }
        }
    }

    fn ingest(&self, event: PageEvent) {
        let timestamp = now_secs();
        match event {
            PageEvent::Console { level, text } => {
                let relevance = self.filters.classify_console(level, &text);
                self.buffers.lock().console_entries.push(LogEntry {
                    level,
                    text,
                    relevance,
                    timestamp,
                });
            }
            PageEvent::Request { url } => {
                if self.filters.retain_network(&url) {
                    self.buffers.lock().network_entries.push(NetworkEntry {
                        url,
                        status: None,
                        failed: false,
                        timestamp,
                    });
                }
            }
            PageEvent::Response { url, status } => {
                if self.filters.retain_network(&url) {
                    self.buffers.lock().network_entries.push(NetworkEntry {
                        url,
                        status: Some(status),
                        failed: status >= 400,
                        timestamp,
                    });
                }
            }
            PageEvent::RequestFailed { url, reason } => {
                if self.filters.retain_network(&url) {
                    debug!(%url, %reason, "transport failure retained");
                    self.buffers.lock().network_entries.push(NetworkEntry {
                        url,
                        status: None,
                        failed: true,
                        timestamp,
                    });
                }
            }
        }
    }

    /// Samples heap usage at a fixed checkpoint. Best-effort: a runtime
    /// without memory introspection records nothing, and a probe error
    /// never fails the iteration.
    pub async fn sample_memory(&self, checkpoint: &str) -> Option<f64> {
        self.pump();
        match self.page.memory_probe().await {
            Ok(Some(probe)) => {
                let sample = MemorySample::from_probe(probe, checkpoint);
                let usage = sample.usage_percent;
                self.buffers.lock().memory_samples.push(sample);
                Some(usage)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(%err, checkpoint, "memory probe failed, skipping sample");
                None
            }
        }
    }

    pub fn latest_usage_percent(&self) -> Option<f64> {
        self.buffers
            .lock()
            .memory_samples
            .last()
            .map(|s| s.usage_percent)
    }

    /// Freezes and returns the buffers, draining the subscription once
    /// more so nothing queued during the last step is dropped.
    pub fn finish(self) -> TelemetryRecord {
        self.pump();
        self.buffers.into_inner()
    }
}

fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
