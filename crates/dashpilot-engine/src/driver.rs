use crate::resolution::Locator;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Opaque handle to an element returned by [`Driver::query_all`].
///
/// Handles are only valid until the next navigation; drivers are free to
/// reissue ids after that.
pub type ElementId = u32;

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    pub title: String,
}

/// Snapshot of one element matched by a locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInfo {
    pub id: ElementId,
    /// Rendered text, trimmed.
    pub text: String,
    pub visible: bool,
    pub enabled: bool,
    /// The element or one of its ancestors is marked active/current/selected.
    pub active: bool,
    /// Text of the closest enclosing link or list item, if there is one.
    pub container_text: Option<String>,
}

impl ElementInfo {
    pub fn is_interactable(&self) -> bool {
        self.visible && self.enabled
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Driver not ready")]
    NotReady,
    #[error("Navigation failed: {0}")]
    Navigation(String),
    #[error("Query '{selector}' failed: {reason}")]
    Query { selector: String, reason: String },
    #[error("Element {0} is no longer attached")]
    StaleElement(ElementId),
    #[error("Interaction failed: {0}")]
    Interaction(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// The single browser page the workflow drives.
///
/// Every call may fail with a [`DriverError`]. Only the selector resolver
/// turns query failures into control flow; everything else propagates them.
#[async_trait]
pub trait Driver: Send {
    /// Launch the browser and open the page.
    async fn launch(&mut self) -> Result<(), DriverError>;

    /// Close the browser and release its resources.
    async fn close(&mut self) -> Result<(), DriverError>;

    async fn is_ready(&self) -> bool;

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, DriverError>;

    async fn current_url(&mut self) -> Result<String, DriverError>;

    /// All elements currently matching `locator`, in document order.
    async fn query_all(&mut self, locator: &Locator) -> Result<Vec<ElementInfo>, DriverError>;

    /// First element matching `locator`, if any.
    async fn query(&mut self, locator: &Locator) -> Result<Option<ElementInfo>, DriverError> {
        Ok(self.query_all(locator).await?.into_iter().next())
    }

    async fn click(&mut self, element: ElementId) -> Result<(), DriverError>;

    async fn hover(&mut self, element: ElementId) -> Result<(), DriverError>;

    /// Replace the content of an input, textarea or contenteditable element.
    async fn fill(&mut self, element: ElementId, text: &str) -> Result<(), DriverError>;

    async fn text(&mut self, element: ElementId) -> Result<String, DriverError>;

    /// Pick an option of a native `<select>`: the first of `choices` that
    /// some option's text contains (case-insensitive) wins, and the page
    /// sees the usual `input`/`change` events. Returns the chosen option's
    /// text, or `None` when no choice matches.
    async fn select_option(
        &mut self,
        element: ElementId,
        choices: &[String],
    ) -> Result<Option<String>, DriverError>;

    /// Press a key on the focused element (e.g. "Enter").
    async fn press_key(&mut self, key: &str) -> Result<(), DriverError>;

    /// Capture a full-page screenshot to `path`.
    async fn screenshot(&mut self, path: &Path) -> Result<(), DriverError>;

    /// Let the page settle after an action.
    async fn settle(&mut self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
