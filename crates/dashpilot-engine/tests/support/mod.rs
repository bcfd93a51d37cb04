#![allow(dead_code)]

use async_trait::async_trait;
use dashpilot_engine::config::{Credentials, DashpilotConfig};
use dashpilot_engine::confirm::{ConfirmationGate, ScriptedInput};
use dashpilot_engine::dashboard::{DashboardLifecycle, Timing};
use dashpilot_engine::driver::{Driver, DriverError, ElementId, ElementInfo, NavigationResult};
use dashpilot_engine::resolution::{Locator, RetryPolicy, SelectorResolver};
use dashpilot_engine::runlog::{MemoryLog, SharedLog};
use dashpilot_engine::selectors::DashboardSelectors;
use dashpilot_engine::session::{DEFAULT_PREFIX, DEFAULT_SUFFIX, SessionContext};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const APP_URL: &str = "https://app.example.test/";
pub const SESSION_ID: &str = "424242";

pub fn session() -> SessionContext {
    SessionContext::with_session_id(SESSION_ID, DEFAULT_PREFIX, DEFAULT_SUFFIX)
        .with_legacy_patterns(&[r"^Dashboard \d+$", "Zendesk Test"])
}

pub fn fast_timing() -> Timing {
    Timing {
        budget: Duration::from_millis(300),
        short_budget: Duration::from_millis(60),
        settle: Duration::ZERO,
    }
}

pub fn resolver(cancel: &CancellationToken) -> SelectorResolver {
    SelectorResolver::new(Duration::from_millis(5), cancel.clone())
}

/// A lifecycle wired to a scripted operator and an in-memory log.
pub fn lifecycle(answers: &[&str]) -> (DashboardLifecycle, Arc<MemoryLog>) {
    let log = Arc::new(MemoryLog::new());
    let shared: SharedLog = log.clone();
    let cancel = CancellationToken::new();
    let gate = ConfirmationGate::new(
        Box::new(ScriptedInput::new(answers.iter().copied())),
        shared.clone(),
        cancel.clone(),
    );
    let lifecycle = DashboardLifecycle::new(DashboardSelectors::default(), resolver(&cancel), gate, shared)
        .with_timing(fast_timing())
        .with_retry(RetryPolicy::new(2, Duration::ZERO));
    (lifecycle, log)
}

/// Default config with test-sized budgets and artifacts under `dir`.
pub fn fast_config(dir: &Path) -> DashpilotConfig {
    let mut config = DashpilotConfig::default();
    config.target.base_url = "https://app.example.test".to_string();
    config.target.app_url = APP_URL.to_string();
    config.resolution.budget_ms = 300;
    config.resolution.short_budget_ms = 60;
    config.resolution.poll_interval_ms = 5;
    config.resolution.settle_ms = 0;
    config.retry.max_attempts = 2;
    config.retry.delay_ms = 0;
    config.artifacts.screenshot_dir = dir.join("screenshots");
    config.artifacts.log_file = dir.join("run-log.txt");
    config.artifacts.summary_file = dir.join("summary.txt");
    config
}

pub fn credentials() -> Credentials {
    Credentials {
        email: "qa@example.test".to_string(),
        password: "s3cret".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Target {
    Email,
    Password,
    Submit,
    SidebarLink(String),
    NewDashboard,
    RowMenu(String),
    MenuRename,
    MenuDelete,
    DialogDelete,
    TitleInput,
    AddWidget,
    Integration,
    Metric(String),
    PeriodSelect,
    StatusSelect,
    AddFilter,
}

pub const METRICS: &[&str] = &["First reply time", "Satisfaction score"];
pub const PERIOD_OPTIONS: &[&str] = &["Yesterday", "Last 24 hours", "Today", "This week"];
pub const STATUS_OPTIONS: &[&str] = &["Open", "Pending", "Solved"];

struct Rendered {
    css: &'static [&'static str],
    target: Target,
    text: String,
    visible: bool,
    active: bool,
    container: Option<String>,
}

/// Simulates the dashboard application closely enough for the default
/// selectors: sidebar links, per-row context menus that appear on hover,
/// rename via a title input committed with Enter, an optional delete dialog,
/// and the widget picker (metric tiles, native selects for period and status).
#[derive(Default)]
pub struct FakeApp {
    pub dashboards: Vec<String>,
    pub active: Option<usize>,
    pub logged_in: bool,
    pub url: String,
    /// Show a confirmation dialog after "Delete" in the context menu.
    pub confirm_dialog: bool,
    /// Leave the active marker off the sidebar links.
    pub hide_active_marker: bool,
    /// CSS selectors that never match (markup drift).
    pub hidden: HashSet<String>,
    /// CSS selectors whose queries fail.
    pub failing: HashSet<String>,
    /// Targets (by `Debug` name, e.g. `MenuRename`) whose clicks always fail.
    pub failing_clicks: HashSet<String>,
    pub calls: Vec<String>,
    pub filled: HashMap<String, String>,
    pub widget_events: Vec<String>,
    pub screenshots: Vec<PathBuf>,
    pub closed: bool,
    hovered: Option<String>,
    menu_for: Option<String>,
    renaming: Option<String>,
    title_value: String,
    dialog_for: Option<String>,
    widget_stage: u8,
    created: u32,
    targets: Vec<Target>,
}

impl FakeApp {
    pub fn new(dashboards: &[&str], active: Option<usize>) -> Self {
        Self {
            dashboards: dashboards.iter().map(|d| d.to_string()).collect(),
            active,
            logged_in: true,
            url: format!("{}dashboards/1", APP_URL),
            ..Self::default()
        }
    }

    pub fn logged_out(dashboards: &[&str], active: Option<usize>) -> Self {
        Self {
            logged_in: false,
            url: "about:blank".to_string(),
            ..Self::new(dashboards, active)
        }
    }

    pub fn hide(mut self, css: &str) -> Self {
        self.hidden.insert(css.to_string());
        self
    }

    pub fn fail_clicks_on(mut self, target: &str) -> Self {
        self.failing_clicks.insert(target.to_string());
        self
    }

    pub fn calls_to(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == call).count()
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    pub fn clicks(&self) -> usize {
        self.calls.iter().filter(|c| c.starts_with("click")).count()
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.map(|i| self.dashboards[i].as_str())
    }

    fn id_for(&mut self, target: &Target) -> ElementId {
        match self.targets.iter().position(|t| t == target) {
            Some(i) => i as ElementId + 1,
            None => {
                self.targets.push(target.clone());
                self.targets.len() as ElementId
            }
        }
    }

    fn target(&self, id: ElementId) -> Result<Target, DriverError> {
        (id as usize)
            .checked_sub(1)
            .and_then(|i| self.targets.get(i))
            .cloned()
            .ok_or(DriverError::StaleElement(id))
    }

    fn edit_url(index: usize) -> String {
        format!("{}edit/dashboards/{}", APP_URL, index + 1)
    }

    fn render(&self) -> Vec<Rendered> {
        let mut out = Vec::new();
        let el = |css: &'static [&'static str], target: Target, text: &str| Rendered {
            css,
            target,
            text: text.to_string(),
            visible: true,
            active: false,
            container: None,
        };

        if !self.logged_in {
            if self.url.contains("/login") {
                out.push(el(&[r#"input[type="email"]"#], Target::Email, ""));
                out.push(el(&[r#"input[type="password"]"#], Target::Password, ""));
                out.push(el(&[r#"button[type="submit"]"#, "button"], Target::Submit, "Log in"));
            }
            return out;
        }

        for (i, name) in self.dashboards.iter().enumerate() {
            out.push(Rendered {
                css: &["a.sidebarListLink---e8cba"],
                target: Target::SidebarLink(name.clone()),
                text: name.clone(),
                visible: true,
                active: !self.hide_active_marker && self.active == Some(i),
                container: Some(name.clone()),
            });
            out.push(Rendered {
                css: &["button.openContextMenuButton---_8f4e", "button"],
                target: Target::RowMenu(name.clone()),
                text: String::new(),
                visible: self.hovered.as_deref() == Some(name.as_str()),
                active: false,
                container: Some(name.clone()),
            });
        }
        out.push(el(&["button"], Target::NewDashboard, "New dashboard"));

        if self.menu_for.is_some() {
            out.push(el(&["span.menuItemLabel---f5516"], Target::MenuRename, "Rename"));
            out.push(el(&["span.menuItemLabel---f5516"], Target::MenuDelete, "Delete"));
        }
        if self.renaming.is_some() {
            out.push(el(&[r#"input[type="text"]"#], Target::TitleInput, ""));
        }
        if self.dialog_for.is_some() {
            out.push(el(&[r#"[role="dialog"] button"#, "button"], Target::DialogDelete, "Delete"));
        }
        if self.url.contains("/edit/dashboards/") {
            out.push(el(&["button"], Target::AddWidget, "Add widget"));
            if self.widget_stage >= 1 {
                out.push(el(
                    &[r#"a[data-service-name="zendesk3"]"#],
                    Target::Integration,
                    "Zendesk Support",
                ));
            }
            if self.widget_stage >= 2 {
                for metric in METRICS.iter().copied() {
                    out.push(el(&["span.title---_3e44"], Target::Metric(metric.to_string()), metric));
                }
                out.push(el(&[r#"select[name*="time"]"#], Target::PeriodSelect, ""));
                out.push(el(&[r#"select[name*="status"]"#], Target::StatusSelect, ""));
                out.push(el(&["button"], Target::AddFilter, "Add filter"));
            }
        }
        out
    }

    fn remove_dashboard(&mut self, name: &str) {
        if let Some(index) = self.dashboards.iter().position(|d| d == name) {
            self.dashboards.remove(index);
            self.active = match self.active {
                Some(a) if a == index => None,
                Some(a) if a > index => Some(a - 1),
                other => other,
            };
        }
    }
}

#[async_trait]
impl Driver for FakeApp {
    async fn launch(&mut self) -> Result<(), DriverError> {
        self.calls.push("launch".to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.calls.push("close".to_string());
        self.closed = true;
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        !self.closed
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, DriverError> {
        self.calls.push(format!("navigate {}", url));
        self.url = url.to_string();
        if self.logged_in && url.contains("/login") {
            self.url = format!("{}dashboards/1", APP_URL);
        }
        self.hovered = None;
        self.menu_for = None;
        Ok(NavigationResult {
            url: self.url.clone(),
            title: "Dashboards".to_string(),
        })
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        self.calls.push("current_url".to_string());
        Ok(self.url.clone())
    }

    async fn query_all(&mut self, locator: &Locator) -> Result<Vec<ElementInfo>, DriverError> {
        self.calls.push(format!("query {}", locator));
        let css = locator.css_part();
        if self.failing.contains(css) {
            return Err(DriverError::Query {
                selector: css.to_string(),
                reason: "invalid selector".to_string(),
            });
        }
        if self.hidden.contains(css) {
            return Ok(Vec::new());
        }

        let matched: Vec<Rendered> = self
            .render()
            .into_iter()
            .filter(|r| r.css.iter().any(|c| *c == css) && locator.matches_text(&r.text))
            .collect();
        let mut elements = Vec::new();
        for r in matched {
            let id = self.id_for(&r.target);
            elements.push(ElementInfo {
                id,
                text: r.text,
                visible: r.visible,
                enabled: true,
                active: r.active,
                container_text: r.container,
            });
        }
        Ok(elements)
    }

    async fn click(&mut self, element: ElementId) -> Result<(), DriverError> {
        let target = self.target(element)?;
        self.calls.push(format!("click {:?}", target));
        if self.failing_clicks.contains(&format!("{:?}", target)) {
            return Err(DriverError::Interaction("element is covered by another element".to_string()));
        }
        match target {
            Target::Submit => {
                self.logged_in = true;
                self.url = format!("{}dashboards/1", APP_URL);
            }
            Target::SidebarLink(name) => {
                let index = self
                    .dashboards
                    .iter()
                    .position(|d| *d == name)
                    .ok_or(DriverError::StaleElement(element))?;
                self.active = Some(index);
                self.url = Self::edit_url(index);
                self.menu_for = None;
            }
            Target::NewDashboard => {
                self.created += 1;
                self.dashboards.push(format!("Dashboard {}", self.created));
                let index = self.dashboards.len() - 1;
                self.active = Some(index);
                self.url = Self::edit_url(index);
            }
            Target::RowMenu(name) => {
                if self.hovered.as_deref() != Some(name.as_str()) {
                    return Err(DriverError::Interaction("element is not visible".to_string()));
                }
                self.menu_for = Some(name);
            }
            Target::MenuRename => {
                self.renaming = self.menu_for.take();
                self.title_value = self.renaming.clone().unwrap_or_default();
            }
            Target::MenuDelete => {
                if let Some(name) = self.menu_for.take() {
                    if self.confirm_dialog {
                        self.dialog_for = Some(name);
                    } else {
                        self.remove_dashboard(&name);
                    }
                }
            }
            Target::DialogDelete => {
                if let Some(name) = self.dialog_for.take() {
                    self.remove_dashboard(&name);
                }
            }
            Target::AddWidget => self.widget_stage = 1,
            Target::Integration => self.widget_stage = 2,
            Target::Metric(name) => self.widget_events.push(format!("metric {}", name)),
            Target::AddFilter => self.widget_events.push("filter".to_string()),
            Target::Email
            | Target::Password
            | Target::TitleInput
            | Target::PeriodSelect
            | Target::StatusSelect => {}
        }
        Ok(())
    }

    async fn hover(&mut self, element: ElementId) -> Result<(), DriverError> {
        let target = self.target(element)?;
        self.calls.push(format!("hover {:?}", target));
        if let Target::SidebarLink(name) = target {
            self.hovered = Some(name);
        }
        Ok(())
    }

    async fn fill(&mut self, element: ElementId, text: &str) -> Result<(), DriverError> {
        let target = self.target(element)?;
        self.calls.push(format!("fill {:?}", target));
        match target {
            Target::TitleInput => self.title_value = text.to_string(),
            other => {
                self.filled.insert(format!("{:?}", other), text.to_string());
            }
        }
        Ok(())
    }

    async fn text(&mut self, element: ElementId) -> Result<String, DriverError> {
        let target = self.target(element)?;
        Ok(self
            .render()
            .into_iter()
            .find(|r| r.target == target)
            .map(|r| r.text)
            .unwrap_or_default())
    }

    async fn select_option(
        &mut self,
        element: ElementId,
        choices: &[String],
    ) -> Result<Option<String>, DriverError> {
        let target = self.target(element)?;
        self.calls.push(format!("select {:?}", target));
        let (event, options) = match target {
            Target::PeriodSelect => ("period", PERIOD_OPTIONS),
            Target::StatusSelect => ("status", STATUS_OPTIONS),
            other => {
                return Err(DriverError::Interaction(format!("{:?} is not a select", other)));
            }
        };
        let picked = choices.iter().find_map(|choice| {
            let choice = choice.to_lowercase();
            options.iter().find(|o| o.to_lowercase().contains(&choice))
        });
        if let Some(option) = picked {
            self.widget_events.push(format!("{} {}", event, option));
        }
        Ok(picked.map(|o| o.to_string()))
    }

    async fn press_key(&mut self, key: &str) -> Result<(), DriverError> {
        self.calls.push(format!("press {}", key));
        if key == "Enter"
            && let Some(old) = self.renaming.take()
            && let Some(slot) = self.dashboards.iter_mut().find(|d| **d == old)
        {
            *slot = self.title_value.clone();
        }
        Ok(())
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), DriverError> {
        self.calls.push(format!("screenshot {}", path.display()));
        self.screenshots.push(path.to_path_buf());
        Ok(())
    }
}

/// Fixed DOM keyed by CSS selector; records every query.
#[derive(Default)]
pub struct StaticDriver {
    pub elements: HashMap<String, Vec<ElementInfo>>,
    pub failing: HashSet<String>,
    /// Queries for these selectors never return.
    pub hanging: HashSet<String>,
    pub queries: Vec<String>,
    /// Delay applied to every query.
    pub latency: Duration,
}

impl StaticDriver {
    pub fn with(mut self, css: &str, elements: Vec<ElementInfo>) -> Self {
        self.elements.insert(css.to_string(), elements);
        self
    }

    pub fn queried(&self, css: &str) -> usize {
        self.queries.iter().filter(|q| q.as_str() == css).count()
    }
}

pub fn element(id: ElementId, text: &str) -> ElementInfo {
    ElementInfo {
        id,
        text: text.to_string(),
        visible: true,
        enabled: true,
        active: false,
        container_text: None,
    }
}

#[async_trait]
impl Driver for StaticDriver {
    async fn launch(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        true
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, DriverError> {
        Ok(NavigationResult {
            url: url.to_string(),
            title: String::new(),
        })
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        Ok("about:blank".to_string())
    }

    async fn query_all(&mut self, locator: &Locator) -> Result<Vec<ElementInfo>, DriverError> {
        let css = locator.css_part().to_string();
        self.queries.push(css.clone());
        if self.hanging.contains(&css) {
            std::future::pending::<()>().await;
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.failing.contains(&css) {
            return Err(DriverError::Query {
                selector: css,
                reason: "unsupported pseudo-class".to_string(),
            });
        }
        Ok(self.elements.get(&css).cloned().unwrap_or_default())
    }

    async fn click(&mut self, _element: ElementId) -> Result<(), DriverError> {
        Ok(())
    }

    async fn hover(&mut self, _element: ElementId) -> Result<(), DriverError> {
        Ok(())
    }

    async fn fill(&mut self, _element: ElementId, _text: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn text(&mut self, _element: ElementId) -> Result<String, DriverError> {
        Ok(String::new())
    }

    async fn select_option(
        &mut self,
        _element: ElementId,
        choices: &[String],
    ) -> Result<Option<String>, DriverError> {
        Ok(choices.first().cloned())
    }

    async fn press_key(&mut self, _key: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn screenshot(&mut self, _path: &Path) -> Result<(), DriverError> {
        Ok(())
    }
}
