//! Shared primitives for the webstress harness crates.
//!
//! Holds the step/selector wire model loaded from test-path files, the
//! closed error-kind taxonomy, and the timing policy shared by the
//! locator, executor and runner crates.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identifier for one campaign invocation.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct CampaignId(pub String);

impl CampaignId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for CampaignId {
    fn default() -> Self {
        Self::new()
    }
}

/// Addressing strategy for a UI element.
///
/// Closed set: a step's kind is fixed at load time and resolution never
/// falls back to an alternate kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    /// Visible-text search, optionally scoped under `base`.
    Text,
    /// Exact match on the stable per-element identifier attribute.
    #[serde(rename = "testid")]
    TestId,
    /// Opaque structured query, passed through to the page's query layer.
    Composite,
    /// Product-scoped section lookup by product-identifier attribute.
    SectionProduct,
}

impl SelectorKind {
    pub fn name(&self) -> &'static str {
        match self {
            SelectorKind::Text => "text",
            SelectorKind::TestId => "testid",
            SelectorKind::Composite => "composite",
            SelectorKind::SectionProduct => "section_product",
        }
    }
}

/// Declarative element address, loaded from a test-path file and never
/// mutated afterwards.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SelectorSpec {
    #[serde(rename = "selector_type")]
    pub kind: SelectorKind,
    #[serde(rename = "selector_value")]
    pub value: String,
    /// Scope for `text` lookups. Only legal when `kind` is `Text`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

impl SelectorSpec {
    /// Checks the structural invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigViolation> {
        if self.value.trim().is_empty() {
            return Err(ConfigViolation::EmptySelectorValue {
                kind: self.kind.name(),
            });
        }
        if self.base.is_some() && self.kind != SelectorKind::Text {
            return Err(ConfigViolation::BaseOnNonText {
                kind: self.kind.name(),
            });
        }
        Ok(())
    }
}

/// Typed action applied to a resolved element.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Click,
    IncrementQuantity,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Click => "click",
            Action::IncrementQuantity => "increment_quantity",
        }
    }
}

/// One entry of the configured interaction sequence.
///
/// The wire shape keeps the test-path field names (`step`, `action`,
/// `selector_type`, `selector_value`, `base`).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "step")]
    pub label: String,
    pub action: Action,
    #[serde(flatten)]
    pub selector: SelectorSpec,
}

impl Step {
    pub fn validate(&self) -> Result<(), ConfigViolation> {
        if self.label.trim().is_empty() {
            return Err(ConfigViolation::UnlabeledStep);
        }
        self.selector.validate()
    }
}

/// Structural configuration problems caught before any iteration runs.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ConfigViolation {
    #[error("step has an empty label")]
    UnlabeledStep,
    #[error("selector of kind '{kind}' has an empty value")]
    EmptySelectorValue { kind: &'static str },
    #[error("'base' is only meaningful for text selectors, found on '{kind}'")]
    BaseOnNonText { kind: &'static str },
    #[error("iteration count must be at least 1, got {got}")]
    BadIterationCount { got: u32 },
    #[error("test path contains no steps")]
    NoSteps,
}

/// Closed failure taxonomy.
///
/// The first four kinds are local to a single step; they mark one
/// iteration as failed and never propagate past the step runner.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("element not found")]
    ElementNotFound,
    #[error("ambiguous match")]
    AmbiguousMatch,
    #[error("action timeout")]
    ActionTimeout,
    #[error("control not found")]
    ControlNotFound,
    #[error("configuration error")]
    ConfigurationError,
    #[error("fatal session fault")]
    FatalSessionFault,
}

impl ErrorKind {
    /// Local kinds are recorded into the iteration result; only a fatal
    /// session fault aborts the remaining campaign.
    pub fn is_step_local(&self) -> bool {
        matches!(
            self,
            ErrorKind::ElementNotFound
                | ErrorKind::AmbiguousMatch
                | ErrorKind::ActionTimeout
                | ErrorKind::ControlNotFound
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorKind::FatalSessionFault)
    }
}

/// Per-operation timing policy.
///
/// All waits in the engine are bounded by these values; exceeding one
/// yields a typed failure, never an unbounded block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecPolicy {
    /// Bounded wait for element resolution.
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,
    /// Bounded wait for an element to become interactable.
    #[serde(default = "default_action_timeout_ms")]
    pub action_timeout_ms: u64,
    /// Settle delay after each step.
    #[serde(default = "default_step_settle_ms")]
    pub step_settle_ms: u64,
    /// Settle delay between iterations.
    #[serde(default = "default_iteration_settle_ms")]
    pub iteration_settle_ms: u64,
    /// Usage percentage past which a best-effort heap-relief nudge is
    /// issued after a step. `None` disables the nudge.
    #[serde(default = "default_heap_relief_percent")]
    pub heap_relief_percent: Option<f64>,
}

fn default_resolve_timeout_ms() -> u64 {
    3_000
}

fn default_action_timeout_ms() -> u64 {
    5_000
}

fn default_step_settle_ms() -> u64 {
    1_000
}

fn default_iteration_settle_ms() -> u64 {
    3_000
}

fn default_heap_relief_percent() -> Option<f64> {
    Some(70.0)
}

impl Default for ExecPolicy {
    fn default() -> Self {
        Self {
            resolve_timeout_ms: default_resolve_timeout_ms(),
            action_timeout_ms: default_action_timeout_ms(),
            step_settle_ms: default_step_settle_ms(),
            iteration_settle_ms: default_iteration_settle_ms(),
            heap_relief_percent: default_heap_relief_percent(),
        }
    }
}

impl ExecPolicy {
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn step_settle(&self) -> Duration {
        Duration::from_millis(self.step_settle_ms)
    }

    pub fn iteration_settle(&self) -> Duration {
        Duration::from_millis(self.iteration_settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_keeps_test_path_wire_names() {
        let json = r#"{
            "step": "Add workbench to cart",
            "action": "click",
            "selector_type": "text",
            "selector_value": "Add to Cart",
            "base": "button"
        }"#;

        let step: Step = serde_json::from_str(json).unwrap();
        assert_eq!(step.label, "Add workbench to cart");
        assert_eq!(step.action, Action::Click);
        assert_eq!(step.selector.kind, SelectorKind::Text);
        assert_eq!(step.selector.base.as_deref(), Some("button"));

        let round = serde_json::to_value(&step).unwrap();
        assert_eq!(round["step"], "Add workbench to cart");
        assert_eq!(round["selector_type"], "text");
        assert_eq!(round["selector_value"], "Add to Cart");
    }

    #[test]
    fn unknown_selector_kind_fails_deserialization() {
        let json = r#"{
            "step": "bad",
            "action": "click",
            "selector_type": "xpath",
            "selector_value": "//div"
        }"#;
        assert!(serde_json::from_str::<Step>(json).is_err());
    }

    #[test]
    fn unknown_action_fails_deserialization() {
        let json = r#"{
            "step": "bad",
            "action": "hover",
            "selector_type": "testid",
            "selector_value": "export"
        }"#;
        assert!(serde_json::from_str::<Step>(json).is_err());
    }

    #[test]
    fn base_is_rejected_outside_text_kind() {
        let spec = SelectorSpec {
            kind: SelectorKind::TestId,
            value: "export-button".into(),
            base: Some("button".into()),
        };
        assert_eq!(
            spec.validate(),
            Err(ConfigViolation::BaseOnNonText { kind: "testid" })
        );

        let spec = SelectorSpec {
            kind: SelectorKind::Text,
            value: "Export".into(),
            base: Some("button".into()),
        };
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn error_kind_locality() {
        assert!(ErrorKind::ElementNotFound.is_step_local());
        assert!(ErrorKind::AmbiguousMatch.is_step_local());
        assert!(ErrorKind::ActionTimeout.is_step_local());
        assert!(ErrorKind::ControlNotFound.is_step_local());
        assert!(!ErrorKind::ConfigurationError.is_step_local());
        assert!(!ErrorKind::FatalSessionFault.is_step_local());
        assert!(ErrorKind::FatalSessionFault.is_fatal());
    }
}
