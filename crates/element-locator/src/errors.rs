use thiserror::Error;

use page_port::PageError;
use webstress_core_types::ErrorKind;

/// Resolution failures.
#[derive(Clone, Debug, Error)]
pub enum LocatorError {
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("ambiguous match: {0}")]
    AmbiguousMatch(String),
    #[error(transparent)]
    Page(#[from] PageError),
}

impl LocatorError {
    /// Taxonomy kind recorded into the iteration result.
    ///
    /// A non-fatal page error during a query reads as the element being
    /// unreachable; a fatal one aborts the campaign.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LocatorError::ElementNotFound(_) => ErrorKind::ElementNotFound,
            LocatorError::AmbiguousMatch(_) => ErrorKind::AmbiguousMatch,
            LocatorError::Page(err) if err.is_fatal() => ErrorKind::FatalSessionFault,
            LocatorError::Page(_) => ErrorKind::ElementNotFound,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }
}
