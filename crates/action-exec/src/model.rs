use std::time::Instant;

use page_port::ElementRef;

/// Outcome of one executed action.
#[derive(Clone, Debug)]
pub struct ActionReport {
    pub started_at: Instant,
    pub finished_at: Instant,
    pub latency_ms: u128,
    /// The element the gesture actually landed on; for
    /// `increment_quantity` this is the nested control, not the section.
    pub target: ElementRef,
}

impl ActionReport {
    pub(crate) fn finish(started_at: Instant, target: ElementRef) -> Self {
        let finished_at = Instant::now();
        Self {
            started_at,
            finished_at,
            latency_ms: finished_at
                .saturating_duration_since(started_at)
                .as_millis(),
            target,
        }
    }
}
