use std::time::Duration;

use page_port::{ElementRef, PagePort};
use tokio::time::Instant;
use tracing::trace;

use crate::errors::ActionError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Waits for the element to be visible and enabled, bounded by `timeout`.
pub(crate) async fn wait_interactable(
    page: &dyn PagePort,
    el: &ElementRef,
    timeout: Duration,
) -> Result<(), ActionError> {
    let deadline = Instant::now() + timeout;
    loop {
        let visible = page.is_visible(el).await?;
        let enabled = page.is_enabled(el).await?;
        if visible && enabled {
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(ActionError::Timeout {
                what: format!(
                    "{} (visible={visible}, enabled={enabled})",
                    el.node_id
                ),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        trace!(node = %el.node_id, visible, enabled, "waiting for interactability");
        tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}
