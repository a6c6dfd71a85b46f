//! Bounded-wait resolution loop.

use std::time::Duration;

use page_port::{ElementRef, PagePort};
use tokio::time::Instant;
use tracing::{debug, trace};
use webstress_core_types::SelectorSpec;

use crate::errors::LocatorError;
use crate::strategies::resolve_once;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Resolves `spec` against the page, polling until `timeout` elapses.
///
/// Fails with [`LocatorError::ElementNotFound`] once the deadline passes
/// with no match, and with [`LocatorError::AmbiguousMatch`] immediately if
/// the kind admits no disambiguation rule and more than one element
/// matches.
pub async fn resolve(
    page: &dyn PagePort,
    spec: &SelectorSpec,
    timeout: Duration,
) -> Result<ElementRef, LocatorError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(element) = resolve_once(page, spec).await? {
            debug!(
                kind = spec.kind.name(),
                value = %spec.value,
                node = %element.node_id,
                "resolved element"
            );
            return Ok(element);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(LocatorError::ElementNotFound(format!(
                "{} '{}' did not match within {:?}",
                spec.kind.name(),
                spec.value,
                timeout
            )));
        }
        trace!(kind = spec.kind.name(), value = %spec.value, "no match yet, polling");
        tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}
