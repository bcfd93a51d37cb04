use crate::cdp::CdpClient;
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use dashpilot_engine::config::BrowserConfig as BrowserOptions;
use dashpilot_engine::driver::{Driver, DriverError, ElementId, ElementInfo, NavigationResult};
use dashpilot_engine::resolution::Locator;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Everything the resolver needs to know about a match, gathered in one
/// round trip.
const ELEMENT_STATE_JS: &str = r#"function() {
    const style = window.getComputedStyle(this);
    const rect = this.getBoundingClientRect();
    const visible = style.visibility !== 'hidden' && style.display !== 'none'
        && rect.width > 0 && rect.height > 0;
    const enabled = !this.disabled && this.getAttribute('aria-disabled') !== 'true';
    const active = !!this.closest('.active, [aria-current="page"], [aria-selected="true"]');
    const container = this.closest('a, li');
    const text = (this.innerText || this.textContent || this.value || '').trim();
    return JSON.stringify({
        text,
        visible,
        enabled,
        active,
        container: container ? (container.innerText || container.textContent || '').trim() : null,
    });
}"#;

/// Focus and select the current content so typing replaces it. Works for
/// framework-controlled inputs, which ignore direct `value` writes.
const SELECT_CONTENT_JS: &str = r#"function() {
    this.focus();
    if (typeof this.select === 'function') {
        this.select();
    } else if (this.isContentEditable) {
        const range = document.createRange();
        range.selectNodeContents(this);
        const selection = window.getSelection();
        selection.removeAllRanges();
        selection.addRange(range);
    }
}"#;

const CONNECTED_JS: &str = "function() { return this.isConnected; }";

/// `__CHOICES__` is replaced with a JSON array of option texts.
const SELECT_OPTION_JS: &str = r#"function() {
    const choices = __CHOICES__.map(c => c.toLowerCase());
    const options = Array.from(this.options || []);
    for (const choice of choices) {
        const option = options.find(o => (o.text || '').trim().toLowerCase().includes(choice));
        if (option) {
            this.value = option.value;
            this.dispatchEvent(new Event('input', { bubbles: true }));
            this.dispatchEvent(new Event('change', { bubbles: true }));
            return (option.text || '').trim();
        }
    }
    return null;
}"#;

#[derive(Debug, Deserialize)]
struct ElementState {
    text: String,
    visible: bool,
    enabled: bool,
    active: bool,
    container: Option<String>,
}

pub struct ChromiumDriver {
    client: Option<CdpClient>,
    options: BrowserOptions,
    elements: HashMap<ElementId, Element>,
    /// Backend node id to handle, so re-querying the same node keeps its id.
    handles: HashMap<i64, ElementId>,
    next_id: ElementId,
    /// URL the registry belongs to; handles are dropped when it changes.
    page_url: Option<String>,
}

impl ChromiumDriver {
    pub fn new(options: BrowserOptions) -> Self {
        Self {
            client: None,
            options,
            elements: HashMap::new(),
            handles: HashMap::new(),
            next_id: 1,
            page_url: None,
        }
    }

    fn page(&self) -> Result<&Page, DriverError> {
        self.client
            .as_ref()
            .map(|c| &c.page)
            .ok_or(DriverError::NotReady)
    }

    fn element(&self, id: ElementId) -> Result<&Element, DriverError> {
        self.elements.get(&id).ok_or(DriverError::StaleElement(id))
    }

    fn forget_elements(&mut self) {
        self.elements.clear();
        self.handles.clear();
    }

    fn forget(&mut self, id: ElementId) {
        self.elements.remove(&id);
        self.handles.retain(|_, handle| *handle != id);
    }

    /// Fail with `StaleElement` (and drop the handle) once the node has left
    /// the document.
    async fn ensure_live(&mut self, id: ElementId) -> Result<(), DriverError> {
        let connected = self
            .element(id)?
            .call_js_fn(CONNECTED_JS, false)
            .await
            .ok()
            .and_then(|returns| returns.result.value)
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        if !connected {
            debug!("Element {} left the document", id);
            self.forget(id);
            return Err(DriverError::StaleElement(id));
        }
        Ok(())
    }

    /// Client-side route changes do not go through `navigate`.
    fn track_url(&mut self, url: &str) {
        if self.page_url.as_deref() != Some(url) {
            if self.page_url.is_some() {
                debug!("Page moved to {}; dropping {} element handles", url, self.elements.len());
            }
            self.forget_elements();
            self.page_url = Some(url.to_string());
        }
    }

    fn register(&mut self, element: Element) -> ElementId {
        let node = *element.backend_node_id.inner();
        let id = match self.handles.get(&node) {
            Some(id) => *id,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                self.handles.insert(node, id);
                id
            }
        };
        self.elements.insert(id, element);
        id
    }

    async fn read_state(element: &Element) -> Result<ElementState, DriverError> {
        let returns = element
            .call_js_fn(ELEMENT_STATE_JS, false)
            .await
            .map_err(|e| DriverError::Other(format!("reading element state failed: {}", e)))?;
        let raw = returns
            .result
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| DriverError::Other("element state came back empty".to_string()))?;
        serde_json::from_str(raw)
            .map_err(|e| DriverError::Other(format!("element state is not valid JSON: {}", e)))
    }

    async fn get_navigation_result(page: &Page) -> Result<NavigationResult, DriverError> {
        let title = page
            .get_title()
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        let url = page
            .url()
            .await
            .map_err(|e| DriverError::Navigation(e.to_string()))?
            .unwrap_or_default();
        Ok(NavigationResult { url, title })
    }

    async fn dispatch_key(page: &Page, down: bool, key: &str) -> Result<(), DriverError> {
        let kind = if down {
            DispatchKeyEventType::KeyDown
        } else {
            DispatchKeyEventType::KeyUp
        };
        let mut builder = DispatchKeyEventParams::builder().r#type(kind).key(key);
        if let Some((code, virtual_key, text)) = key_definition(key) {
            builder = builder.code(code).windows_virtual_key_code(virtual_key);
            if down && let Some(text) = text {
                builder = builder.text(text);
            }
        }
        let event = builder
            .build()
            .map_err(|e| DriverError::Other(format!("Failed to build key event: {:?}", e)))?;
        page.execute(event)
            .await
            .map_err(|e| DriverError::Interaction(format!("press_key '{}' failed: {}", key, e)))?;
        Ok(())
    }
}

/// CDP needs the code and virtual key code for keys with default actions
/// (Enter submits, Tab moves focus).
fn key_definition(key: &str) -> Option<(&'static str, i64, Option<&'static str>)> {
    match key {
        "Enter" => Some(("Enter", 13, Some("\r"))),
        "Tab" => Some(("Tab", 9, None)),
        "Escape" => Some(("Escape", 27, None)),
        "Backspace" => Some(("Backspace", 8, None)),
        _ => None,
    }
}

#[async_trait]
impl Driver for ChromiumDriver {
    async fn launch(&mut self) -> Result<(), DriverError> {
        info!("Launching Chromium driver...");
        let client = CdpClient::launch(&self.options)
            .await
            .map_err(|e| DriverError::Other(e.to_string()))?;
        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.forget_elements();
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| DriverError::Other(e.to_string()))?;
        }
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.client.is_some()
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, DriverError> {
        let timeout = Duration::from_millis(self.options.navigation_timeout_ms);
        self.forget_elements();
        let page = self.page()?;
        tokio::time::timeout(timeout, page.goto(url))
            .await
            .map_err(|_| {
                DriverError::Navigation(format!("{} did not load within {:?}", url, timeout))
            })?
            .map_err(|e| DriverError::Navigation(e.to_string()))?;
        let result = Self::get_navigation_result(page).await?;
        self.page_url = Some(result.url.clone());
        Ok(result)
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        let url = Self::get_navigation_result(self.page()?).await?.url;
        self.track_url(&url);
        Ok(url)
    }

    async fn query_all(&mut self, locator: &Locator) -> Result<Vec<ElementInfo>, DriverError> {
        let found = self
            .page()?
            .find_elements(locator.css_part())
            .await
            .map_err(|e| DriverError::Query {
                selector: locator.css_part().to_string(),
                reason: e.to_string(),
            });
        // An empty result is reported as an error by some CDP versions.
        let found = match found {
            Ok(found) => found,
            Err(e) if e.to_string().contains("No node") => Vec::new(),
            Err(e) => return Err(e),
        };

        let mut matches = Vec::new();
        for element in found {
            let state = match Self::read_state(&element).await {
                Ok(state) => state,
                Err(e) => {
                    debug!("Skipping detached match for {}: {}", locator, e);
                    if let Some(id) = self.handles.get(element.backend_node_id.inner()).copied() {
                        self.forget(id);
                    }
                    continue;
                }
            };
            if !locator.matches_text(&state.text) {
                continue;
            }
            let id = self.register(element);
            matches.push(ElementInfo {
                id,
                text: state.text,
                visible: state.visible,
                enabled: state.enabled,
                active: state.active,
                container_text: state.container,
            });
        }
        Ok(matches)
    }

    async fn click(&mut self, element: ElementId) -> Result<(), DriverError> {
        self.ensure_live(element).await?;
        self.element(element)?
            .click()
            .await
            .map_err(|e| DriverError::Interaction(format!("click failed: {}", e)))?;
        Ok(())
    }

    async fn hover(&mut self, element: ElementId) -> Result<(), DriverError> {
        self.ensure_live(element).await?;
        let target = self.element(element)?;
        target
            .scroll_into_view()
            .await
            .map_err(|e| DriverError::Interaction(format!("hover failed: {}", e)))?;
        let point = target
            .clickable_point()
            .await
            .map_err(|e| DriverError::Interaction(format!("hover failed: {}", e)))?;
        self.page()?
            .move_mouse(point)
            .await
            .map_err(|e| DriverError::Interaction(format!("hover failed: {}", e)))?;
        Ok(())
    }

    async fn fill(&mut self, element: ElementId, text: &str) -> Result<(), DriverError> {
        self.ensure_live(element).await?;
        let target = self.element(element)?;
        target
            .call_js_fn(SELECT_CONTENT_JS, false)
            .await
            .map_err(|e| DriverError::Interaction(format!("fill failed: {}", e)))?;
        target
            .type_str(text)
            .await
            .map_err(|e| DriverError::Interaction(format!("fill failed: {}", e)))?;
        Ok(())
    }

    async fn text(&mut self, element: ElementId) -> Result<String, DriverError> {
        self.ensure_live(element).await?;
        let state = Self::read_state(self.element(element)?).await?;
        Ok(state.text)
    }

    async fn select_option(
        &mut self,
        element: ElementId,
        choices: &[String],
    ) -> Result<Option<String>, DriverError> {
        self.ensure_live(element).await?;
        let choices = serde_json::to_string(choices)
            .map_err(|e| DriverError::Other(format!("cannot encode choices: {}", e)))?;
        let returns = self
            .element(element)?
            .call_js_fn(SELECT_OPTION_JS.replace("__CHOICES__", &choices), false)
            .await
            .map_err(|e| DriverError::Interaction(format!("select failed: {}", e)))?;
        Ok(returns
            .result
            .value
            .and_then(|value| value.as_str().map(str::to_string)))
    }

    async fn press_key(&mut self, key: &str) -> Result<(), DriverError> {
        let page = self.page()?;
        Self::dispatch_key(page, true, key).await?;
        Self::dispatch_key(page, false, key).await
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), DriverError> {
        let bytes = self
            .page()?
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .map_err(|e| DriverError::Other(format!("screenshot failed: {}", e)))?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }
}
