use std::time::{Duration, Instant};

use page_port::{ElementRef, PagePort};
use tracing::{debug, info};
use webstress_core_types::Action;

use crate::errors::ActionError;
use crate::model::ActionReport;
use crate::wait::wait_interactable;
use crate::INCREMENT_CONTROL_QUERY;

/// Applies `action` to a resolved element.
///
/// For [`Action::IncrementQuantity`] the element must be a product section
/// (resolved via `section_product`); the executor locates the nested
/// increment control itself and distinguishes a missing control from a
/// missing section.
pub async fn apply(
    page: &dyn PagePort,
    element: &ElementRef,
    action: Action,
    timeout: Duration,
) -> Result<ActionReport, ActionError> {
    let started_at = Instant::now();
    match action {
        Action::Click => {
            wait_interactable(page, element, timeout).await?;
            page.click(element).await?;
            debug!(node = %element.node_id, "click dispatched");
            Ok(ActionReport::finish(started_at, element.clone()))
        }
        Action::IncrementQuantity => {
            let controls = page
                .query_within(element, INCREMENT_CONTROL_QUERY)
                .await?;
            let control = controls
                .into_iter()
                .next()
                .ok_or_else(|| ActionError::ControlNotFound(element.node_id.clone()))?;

            wait_interactable(page, &control, timeout).await?;
            page.click(&control).await?;
            info!(
                section = %element.node_id,
                control = %control.node_id,
                "quantity incremented"
            );
            Ok(ActionReport::finish(started_at, control))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_port::scripted::{ScriptedElement, ScriptedPage};

    const TIMEOUT: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn click_waits_then_dispatches() {
        let page = ScriptedPage::new();
        page.add_element(ScriptedElement::new("export").with_test_id("export-button"));

        let el = ElementRef::new("export");
        let report = apply(&page, &el, Action::Click, TIMEOUT).await.unwrap();
        assert_eq!(report.target, el);
        assert_eq!(page.click_log(), vec!["export".to_string()]);
    }

    #[tokio::test]
    async fn click_on_disabled_element_times_out() {
        let page = ScriptedPage::new();
        page.add_element(ScriptedElement::new("export").disabled());

        let err = apply(&page, &ElementRef::new("export"), Action::Click, TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Timeout { .. }));
        assert_eq!(err.kind(), webstress_core_types::ErrorKind::ActionTimeout);
        assert!(page.click_log().is_empty());
    }

    #[tokio::test]
    async fn increment_clicks_the_nested_control() {
        let page = ScriptedPage::new();
        page.add_element(ScriptedElement::new("section").with_product_id("workbench-42"));
        page.add_element(
            ScriptedElement::new("plus")
                .with_test_id("increment-button")
                .child_of("section"),
        );

        let report = apply(
            &page,
            &ElementRef::new("section"),
            Action::IncrementQuantity,
            TIMEOUT,
        )
        .await
        .unwrap();
        assert_eq!(report.target.node_id, "plus");
        assert_eq!(page.click_log(), vec!["plus".to_string()]);
    }

    #[tokio::test]
    async fn section_without_control_is_control_not_found() {
        let page = ScriptedPage::new();
        page.add_element(ScriptedElement::new("section").with_product_id("workbench-42"));

        let err = apply(
            &page,
            &ElementRef::new("section"),
            Action::IncrementQuantity,
            TIMEOUT,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ActionError::ControlNotFound(_)));
        assert_eq!(
            err.kind(),
            webstress_core_types::ErrorKind::ControlNotFound
        );
    }
}
