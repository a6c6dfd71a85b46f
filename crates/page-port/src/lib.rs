//! Page-handle and session-factory ports.
//!
//! The harness core never owns a browser process. It talks to a live,
//! navigable document through [`PagePort`] and obtains that handle from a
//! [`SessionFactory`]; process lifecycle, binaries and headless mode are
//! upstream concerns. The crate also ships [`scripted::ScriptedPage`], a
//! deterministic in-memory implementation used by tests and fixture-backed
//! rehearsal runs.

pub mod events;
pub mod scripted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

pub use events::{ConsoleLevel, PageEvent};

/// Opaque handle to a resolved element. Stable for the lifetime of the
/// document state it was resolved against.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    pub node_id: String,
}

impl ElementRef {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
        }
    }
}

/// One heap reading from the page runtime.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryProbe {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub limit_bytes: u64,
}

/// Errors surfaced by a page handle.
///
/// Only [`PageError::SessionGone`] is fatal to a campaign; every other
/// variant is local to the operation that hit it.
#[derive(Clone, Debug, Error)]
pub enum PageError {
    #[error("session no longer usable: {0}")]
    SessionGone(String),
    #[error("element is stale or unknown: {0}")]
    StaleElement(String),
    #[error("script evaluation failed: {0}")]
    Eval(String),
    #[error("screenshot failed: {0}")]
    Screenshot(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
}

impl PageError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, PageError::SessionGone(_))
    }
}

/// A live, navigable document supplied by the browser-session collaborator.
///
/// Queries are opaque pass-throughs: the engine never interprets a
/// structured query string, it hands it to the page's query layer.
#[async_trait]
pub trait PagePort: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    /// All elements matching an opaque structured query.
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementRef>, PageError>;

    /// Elements whose visible text equals or contains `needle`, searched
    /// under `base` when given, else the whole document.
    async fn query_text(
        &self,
        base: Option<&str>,
        needle: &str,
    ) -> Result<Vec<ElementRef>, PageError>;

    /// Elements matching `selector` nested under `root`.
    async fn query_within(
        &self,
        root: &ElementRef,
        selector: &str,
    ) -> Result<Vec<ElementRef>, PageError>;

    async fn is_visible(&self, el: &ElementRef) -> Result<bool, PageError>;

    async fn is_enabled(&self, el: &ElementRef) -> Result<bool, PageError>;

    async fn visible_text(&self, el: &ElementRef) -> Result<String, PageError>;

    async fn click(&self, el: &ElementRef) -> Result<(), PageError>;

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, PageError>;

    /// Capability-checked heap reading. `Ok(None)` means the runtime does
    /// not expose memory introspection; callers record zero samples and
    /// carry on.
    async fn memory_probe(&self) -> Result<Option<MemoryProbe>, PageError>;

    /// Persists a screenshot and returns a reference to it.
    async fn screenshot(&self, label: &str) -> Result<String, PageError>;

    /// Console and network activity stream for this page.
    fn events(&self) -> broadcast::Receiver<PageEvent>;
}

/// Browser-session collaborator: hands out page handles and tears the
/// session down at the end of a campaign.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn new_page(&self) -> Result<Arc<dyn PagePort>, PageError>;
    async fn close(&self) -> Result<(), PageError>;
}
