use thiserror::Error;

use page_port::PageError;
use webstress_core_types::ErrorKind;

/// Action execution failures.
#[derive(Clone, Debug, Error)]
pub enum ActionError {
    #[error("element not interactable within {timeout_ms}ms: {what}")]
    Timeout { what: String, timeout_ms: u64 },
    #[error("section '{0}' has no increment control")]
    ControlNotFound(String),
    #[error(transparent)]
    Page(#[from] PageError),
}

impl ActionError {
    /// Taxonomy kind recorded into the iteration result.
    ///
    /// A stale element under a non-fatal page error means the target went
    /// away between resolution and the gesture.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::Timeout { .. } => ErrorKind::ActionTimeout,
            ActionError::ControlNotFound(_) => ErrorKind::ControlNotFound,
            ActionError::Page(err) if err.is_fatal() => ErrorKind::FatalSessionFault,
            ActionError::Page(_) => ErrorKind::ElementNotFound,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }
}
