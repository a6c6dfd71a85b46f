//! One resolution routine per selector kind.

use page_port::{ElementRef, PagePort};
use tracing::debug;
use webstress_core_types::{SelectorKind, SelectorSpec};

use crate::errors::LocatorError;
use crate::{PRODUCT_ID_ATTR, TEST_ID_ATTR};

/// Single resolution attempt, selected by exhaustive match on the kind.
///
/// `Ok(None)` means "no match yet" and lets the caller keep polling until
/// its deadline; ambiguity is final and returned immediately.
pub(crate) async fn resolve_once(
    page: &dyn PagePort,
    spec: &SelectorSpec,
) -> Result<Option<ElementRef>, LocatorError> {
    match spec.kind {
        SelectorKind::Text => {
            let matches = page.query_text(spec.base.as_deref(), &spec.value).await?;
            // First match is the documented disambiguation rule for text.
            Ok(matches.into_iter().next())
        }
        SelectorKind::TestId => {
            let query = format!("[{TEST_ID_ATTR}='{}']", spec.value);
            let matches = page.query_all(&query).await?;
            if matches.len() > 1 {
                debug!(
                    test_id = %spec.value,
                    count = matches.len(),
                    "multiple elements share a test id, taking the first"
                );
            }
            Ok(matches.into_iter().next())
        }
        SelectorKind::Composite => {
            let matches = page.query_all(&spec.value).await?;
            sole_match(matches, "composite", &spec.value)
        }
        SelectorKind::SectionProduct => {
            let query = format!("[{PRODUCT_ID_ATTR}='{}']", spec.value);
            let matches = page.query_all(&query).await?;
            sole_match(matches, "section_product", &spec.value)
        }
    }
}

fn sole_match(
    mut matches: Vec<ElementRef>,
    kind: &str,
    value: &str,
) -> Result<Option<ElementRef>, LocatorError> {
    match matches.len() {
        0 => Ok(None),
        1 => Ok(Some(matches.remove(0))),
        n => Err(LocatorError::AmbiguousMatch(format!(
            "{kind} '{value}' matched {n} elements"
        ))),
    }
}
