//! Deterministic in-memory page for tests and offline rehearsal.
//!
//! A scripted page answers queries from a declared element registry,
//! replays a memory series one probe at a time, and emits scripted console
//! and network events on navigation. Failure injection covers the two
//! interesting cases: a poisoned session (every call fails fatally) and a
//! navigation budget that poisons the page after N successful loads.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::events::{ConsoleLevel, PageEvent};
use crate::{ElementRef, MemoryProbe, PageError, PagePort, SessionFactory};

const EVENT_BUS_CAPACITY: usize = 1024;

/// Side effect attached to a scripted element's click gesture.
#[derive(Clone, Debug)]
pub enum ClickEffect {
    /// Publish a page event when the element is clicked.
    Emit(PageEvent),
    /// Render the whole session unusable after the click lands.
    Poison(String),
}

/// One element in the scripted document.
#[derive(Clone, Debug)]
pub struct ScriptedElement {
    pub id: String,
    /// Raw query strings this element answers to.
    pub matches: Vec<String>,
    pub test_id: Option<String>,
    pub product_id: Option<String>,
    pub parent: Option<String>,
    pub text: String,
    pub visible: bool,
    pub enabled: bool,
    pub on_click: Vec<ClickEffect>,
}

impl ScriptedElement {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            matches: Vec::new(),
            test_id: None,
            product_id: None,
            parent: None,
            text: String::new(),
            visible: true,
            enabled: true,
            on_click: Vec::new(),
        }
    }

    pub fn matching(mut self, selector: impl Into<String>) -> Self {
        self.matches.push(selector.into());
        self
    }

    pub fn with_test_id(mut self, test_id: impl Into<String>) -> Self {
        self.test_id = Some(test_id.into());
        self
    }

    pub fn with_product_id(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn child_of(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click.push(effect);
        self
    }

    fn answers(&self, selector: &str) -> bool {
        if self.matches.iter().any(|m| m == selector) {
            return true;
        }
        if let Some(test_id) = &self.test_id {
            if selector == format!("[data-testid='{test_id}']") {
                return true;
            }
        }
        if let Some(product_id) = &self.product_id {
            if selector == format!("[data-product-id='{product_id}']") {
                return true;
            }
        }
        false
    }
}

#[derive(Default)]
struct PageState {
    elements: Vec<ScriptedElement>,
    memory_series: VecDeque<MemoryProbe>,
    memory_capability: bool,
    poisoned: Option<String>,
    navigation_budget: Option<usize>,
    on_navigate: Vec<PageEvent>,
    navigations: Vec<String>,
    clicks: Vec<String>,
    screenshots: Vec<String>,
    evaluations: Vec<String>,
}

/// In-memory [`PagePort`] implementation driven entirely by its script.
pub struct ScriptedPage {
    state: Mutex<PageState>,
    events_tx: broadcast::Sender<PageEvent>,
}

impl Default for ScriptedPage {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedPage {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            state: Mutex::new(PageState::default()),
            events_tx,
        }
    }

    pub fn add_element(&self, element: ScriptedElement) {
        self.state.lock().elements.push(element);
    }

    /// Replays the probes in order, one per `memory_probe` call. An
    /// exhausted series reports no capability rather than repeating.
    pub fn set_memory_series(&self, probes: Vec<MemoryProbe>) {
        let mut state = self.state.lock();
        state.memory_series = probes.into();
        state.memory_capability = true;
    }

    /// Convenience: a series expressed as usage percentages of a 1 GiB limit.
    pub fn set_memory_percent_series(&self, percents: Vec<f64>) {
        const LIMIT: u64 = 1 << 30;
        self.set_memory_series(
            percents
                .into_iter()
                .map(|p| MemoryProbe {
                    used_bytes: ((p / 100.0) * LIMIT as f64) as u64,
                    total_bytes: LIMIT,
                    limit_bytes: LIMIT,
                })
                .collect(),
        );
    }

    /// Marks the session unusable; every later port call fails fatally.
    pub fn poison(&self, reason: impl Into<String>) {
        self.state.lock().poisoned = Some(reason.into());
    }

    /// Allows `budget` successful navigations, then poisons the session.
    pub fn set_navigation_budget(&self, budget: usize) {
        self.state.lock().navigation_budget = Some(budget);
    }

    /// Events replayed onto the bus on every navigation.
    pub fn set_events_on_navigate(&self, events: Vec<PageEvent>) {
        self.state.lock().on_navigate = events;
    }

    /// Publishes an event immediately, as a live page would.
    pub fn emit(&self, event: PageEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn navigation_log(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    pub fn click_log(&self) -> Vec<String> {
        self.state.lock().clicks.clone()
    }

    pub fn screenshot_log(&self) -> Vec<String> {
        self.state.lock().screenshots.clone()
    }

    pub fn evaluation_log(&self) -> Vec<String> {
        self.state.lock().evaluations.clone()
    }

    fn guard(&self) -> Result<(), PageError> {
        match &self.state.lock().poisoned {
            Some(reason) => Err(PageError::SessionGone(reason.clone())),
            None => Ok(()),
        }
    }

    fn collect(&self, pick: impl Fn(&ScriptedElement) -> bool) -> Vec<ElementRef> {
        self.state
            .lock()
            .elements
            .iter()
            .filter(|el| pick(el))
            .map(|el| ElementRef::new(el.id.clone()))
            .collect()
    }

    fn element_field<T>(
        &self,
        el: &ElementRef,
        read: impl Fn(&ScriptedElement) -> T,
    ) -> Result<T, PageError> {
        self.state
            .lock()
            .elements
            .iter()
            .find(|e| e.id == el.node_id)
            .map(read)
            .ok_or_else(|| PageError::StaleElement(el.node_id.clone()))
    }
}

#[async_trait]
impl PagePort for ScriptedPage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        self.guard()?;
        let replay = {
            let mut state = self.state.lock();
            if let Some(budget) = state.navigation_budget {
                if state.navigations.len() >= budget {
                    let reason = format!("navigation budget exhausted at {url}");
                    state.poisoned = Some(reason.clone());
                    return Err(PageError::SessionGone(reason));
                }
            }
            state.navigations.push(url.to_string());
            state.on_navigate.clone()
        };
        debug!(url, "scripted navigation");
        for event in replay {
            let _ = self.events_tx.send(event);
        }
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementRef>, PageError> {
        self.guard()?;
        Ok(self.collect(|el| el.answers(selector)))
    }

    async fn query_text(
        &self,
        base: Option<&str>,
        needle: &str,
    ) -> Result<Vec<ElementRef>, PageError> {
        self.guard()?;
        Ok(self.collect(|el| {
            let in_scope = base.map_or(true, |b| el.answers(b));
            in_scope && el.text.contains(needle)
        }))
    }

    async fn query_within(
        &self,
        root: &ElementRef,
        selector: &str,
    ) -> Result<Vec<ElementRef>, PageError> {
        self.guard()?;
        Ok(self.collect(|el| el.parent.as_deref() == Some(root.node_id.as_str()) && el.answers(selector)))
    }

    async fn is_visible(&self, el: &ElementRef) -> Result<bool, PageError> {
        self.guard()?;
        self.element_field(el, |e| e.visible)
    }

    async fn is_enabled(&self, el: &ElementRef) -> Result<bool, PageError> {
        self.guard()?;
        self.element_field(el, |e| e.enabled)
    }

    async fn visible_text(&self, el: &ElementRef) -> Result<String, PageError> {
        self.guard()?;
        self.element_field(el, |e| e.text.clone())
    }

    async fn click(&self, el: &ElementRef) -> Result<(), PageError> {
        self.guard()?;
        let effects = self.element_field(el, |e| e.on_click.clone())?;
        self.state.lock().clicks.push(el.node_id.clone());
        for effect in effects {
            match effect {
                ClickEffect::Emit(event) => {
                    let _ = self.events_tx.send(event);
                }
                ClickEffect::Poison(reason) => self.poison(reason),
            }
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, PageError> {
        self.guard()?;
        self.state.lock().evaluations.push(script.to_string());
        Ok(serde_json::Value::Null)
    }

    async fn memory_probe(&self) -> Result<Option<MemoryProbe>, PageError> {
        self.guard()?;
        let mut state = self.state.lock();
        if !state.memory_capability {
            return Ok(None);
        }
        Ok(state.memory_series.pop_front())
    }

    async fn screenshot(&self, label: &str) -> Result<String, PageError> {
        self.guard()?;
        let reference = format!("screenshots/{label}.png");
        self.state.lock().screenshots.push(reference.clone());
        Ok(reference)
    }

    fn events(&self) -> broadcast::Receiver<PageEvent> {
        self.events_tx.subscribe()
    }
}

/// Session factory handing out one shared scripted page.
pub struct ScriptedSession {
    page: Arc<ScriptedPage>,
}

impl ScriptedSession {
    pub fn new(page: Arc<ScriptedPage>) -> Self {
        Self { page }
    }

    pub fn page(&self) -> Arc<ScriptedPage> {
        Arc::clone(&self.page)
    }
}

#[async_trait]
impl SessionFactory for ScriptedSession {
    async fn new_page(&self) -> Result<Arc<dyn PagePort>, PageError> {
        Ok(Arc::clone(&self.page) as Arc<dyn PagePort>)
    }

    async fn close(&self) -> Result<(), PageError> {
        Ok(())
    }
}

/// Declarative fixture for building a scripted page from a JSON file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageFixture {
    #[serde(default)]
    pub elements: Vec<FixtureElement>,
    /// Usage percentages replayed one per memory probe.
    #[serde(default)]
    pub memory_percent: Vec<f64>,
    /// Console messages emitted on every navigation.
    #[serde(default)]
    pub console: Vec<FixtureConsole>,
    /// Network exchanges emitted on every navigation.
    #[serde(default)]
    pub network: Vec<FixtureNetwork>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FixtureElement {
    pub id: String,
    #[serde(default)]
    pub matches: Vec<String>,
    #[serde(default)]
    pub test_id: Option<String>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FixtureConsole {
    pub level: ConsoleLevel,
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FixtureNetwork {
    pub url: String,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub failed: bool,
}

fn default_true() -> bool {
    true
}

impl PageFixture {
    pub fn build(&self) -> Arc<ScriptedPage> {
        let page = ScriptedPage::new();
        for el in &self.elements {
            page.add_element(ScriptedElement {
                id: el.id.clone(),
                matches: el.matches.clone(),
                test_id: el.test_id.clone(),
                product_id: el.product_id.clone(),
                parent: el.parent.clone(),
                text: el.text.clone(),
                visible: el.visible,
                enabled: el.enabled,
                on_click: Vec::new(),
            });
        }
        if !self.memory_percent.is_empty() {
            page.set_memory_percent_series(self.memory_percent.clone());
        }
        let mut on_navigate = Vec::new();
        for entry in &self.console {
            on_navigate.push(PageEvent::Console {
                level: entry.level,
                text: entry.text.clone(),
            });
        }
        for entry in &self.network {
            on_navigate.push(PageEvent::Request {
                url: entry.url.clone(),
            });
            if entry.failed {
                on_navigate.push(PageEvent::RequestFailed {
                    url: entry.url.clone(),
                    reason: "scripted transport failure".into(),
                });
            } else if let Some(status) = entry.status {
                on_navigate.push(PageEvent::Response {
                    url: entry.url.clone(),
                    status,
                });
            }
        }
        page.set_events_on_navigate(on_navigate);
        Arc::new(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn query_routes_match_declared_elements() {
        let page = ScriptedPage::new();
        page.add_element(
            ScriptedElement::new("export")
                .with_test_id("export-button")
                .matching("button")
                .with_text("Export PDF"),
        );

        let by_test_id = page.query_all("[data-testid='export-button']").await.unwrap();
        assert_eq!(by_test_id.len(), 1);

        let by_text = page.query_text(Some("button"), "Export").await.unwrap();
        assert_eq!(by_text, by_test_id);

        let miss = page.query_text(Some("a"), "Export").await.unwrap();
        assert!(miss.is_empty());
    }

    #[tokio::test]
    async fn click_effects_emit_and_poison() {
        let page = ScriptedPage::new();
        page.add_element(
            ScriptedElement::new("boom")
                .matching("#boom")
                .on_click(ClickEffect::Emit(PageEvent::Console {
                    level: ConsoleLevel::Error,
                    text: "exploded".into(),
                }))
                .on_click(ClickEffect::Poison("tab crashed".into())),
        );

        let mut rx = page.events();
        let el = page.query_all("#boom").await.unwrap().remove(0);
        page.click(&el).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, PageEvent::Console { .. }));

        let err = page.query_all("#boom").await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn memory_series_replays_then_reports_no_capability() {
        let page = ScriptedPage::new();
        assert!(page.memory_probe().await.unwrap().is_none());

        page.set_memory_percent_series(vec![10.0, 55.0]);
        let first = page.memory_probe().await.unwrap().unwrap();
        let second = page.memory_probe().await.unwrap().unwrap();
        assert!(first.used_bytes < second.used_bytes);
        assert!(page.memory_probe().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn navigation_budget_poisons_the_session() {
        let page = ScriptedPage::new();
        page.set_navigation_budget(2);

        page.navigate("https://example.test/run").await.unwrap();
        page.navigate("https://example.test/run").await.unwrap();
        let err = page.navigate("https://example.test/run").await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(page.navigation_log().len(), 2);
    }

    #[tokio::test]
    async fn fixture_builds_elements_and_events() {
        let fixture: PageFixture = serde_json::from_str(
            r#"{
                "elements": [
                    {"id": "cart", "test_id": "add-to-cart", "text": "Add to Cart"}
                ],
                "memory_percent": [12.5],
                "console": [{"level": "warning", "text": "slow frame"}],
                "network": [{"url": "https://cdn.example.test/app.js", "status": 200}]
            }"#,
        )
        .unwrap();

        let page = fixture.build();
        let mut rx = page.events();
        page.navigate("https://example.test").await.unwrap();

        assert!(matches!(rx.try_recv().unwrap(), PageEvent::Console { .. }));
        assert!(matches!(rx.try_recv().unwrap(), PageEvent::Request { .. }));
        assert!(matches!(
            rx.try_recv().unwrap(),
            PageEvent::Response { status: 200, .. }
        ));
        assert!(page.memory_probe().await.unwrap().is_some());
        assert_eq!(
            page.query_all("[data-testid='add-to-cart']").await.unwrap().len(),
            1
        );
    }
}
