//! Selector candidates for every logical UI element the workflow touches.
//!
//! Defaults reflect the markup observed across several releases of the
//! target application; each list can be replaced from the config file.
//!
//! Widget selectors may carry `{placeholder}`s (`{service}`, `{integration}`,
//! `{metric}`, `{period}`, `{status}`) that are filled from
//! `workflow.widget` before resolution; see [`templated`].

use crate::resolution::{Locator, SelectorCandidates};
use serde::{Deserialize, Serialize};

fn locators(selectors: &[&str]) -> Vec<Locator> {
    SelectorCandidates::parse("default", selectors).locators
}

pub fn candidates(label: &str, locators: &[Locator]) -> SelectorCandidates {
    SelectorCandidates {
        label: label.to_string(),
        locators: locators.to_vec(),
    }
}

/// Fill placeholders from `vars`. A locator whose placeholder has no value
/// is dropped, so an unset setting never turns into a literal `{name}`.
pub fn templated(label: &str, locators: &[Locator], vars: &[(&str, Option<&str>)]) -> SelectorCandidates {
    let locators = locators
        .iter()
        .filter_map(|locator| {
            vars.iter().try_fold(locator.clone(), |locator, (name, value)| {
                match (locator.mentions(name), value) {
                    (false, _) => Some(locator),
                    (true, Some(value)) => Some(locator.substitute(name, value)),
                    (true, None) => None,
                }
            })
        })
        .collect();
    SelectorCandidates {
        label: label.to_string(),
        locators,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectorCatalog {
    #[serde(default)]
    pub login: LoginSelectors,
    #[serde(default)]
    pub dashboard: DashboardSelectors,
    #[serde(default)]
    pub widget: WidgetSelectors,
}

impl SelectorCatalog {
    /// Names of lists that are empty and can therefore never resolve.
    /// The native `<select>` lists may be empty; the click lists back them up.
    pub fn empty_lists(&self) -> Vec<&'static str> {
        let all: [(&'static str, &Vec<Locator>); 16] = [
            ("login.email", &self.login.email),
            ("login.password", &self.login.password),
            ("login.submit", &self.login.submit),
            ("dashboard.sidebar_links", &self.dashboard.sidebar_links),
            ("dashboard.new_dashboard", &self.dashboard.new_dashboard),
            ("dashboard.context_menu", &self.dashboard.context_menu),
            ("dashboard.rename_option", &self.dashboard.rename_option),
            ("dashboard.delete_option", &self.dashboard.delete_option),
            ("dashboard.delete_confirm", &self.dashboard.delete_confirm),
            ("dashboard.title_input", &self.dashboard.title_input),
            ("widget.add_widget", &self.widget.add_widget),
            ("widget.integration", &self.widget.integration),
            ("widget.metric", &self.widget.metric),
            ("widget.time_period", &self.widget.time_period),
            ("widget.status", &self.widget.status),
            ("widget.add_filter", &self.widget.add_filter),
        ];
        all.iter()
            .filter(|(_, list)| list.is_empty())
            .map(|(name, _)| *name)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSelectors {
    pub email: Vec<Locator>,
    pub password: Vec<Locator>,
    pub submit: Vec<Locator>,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            email: locators(&[r#"input[type="email"]"#, r#"input[name="email"]"#, "#email"]),
            password: locators(&[
                r#"input[type="password"]"#,
                r#"input[name="password"]"#,
                "#password",
            ]),
            submit: locators(&[
                r#"button[type="submit"]"#,
                r#"input[type="submit"]"#,
                ".login-button",
                r#"[data-testid="login-button"]"#,
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSelectors {
    /// One link per dashboard in the sidebar; its text is the dashboard name.
    pub sidebar_links: Vec<Locator>,
    pub new_dashboard: Vec<Locator>,
    /// Per-row "..." button, shown while the row is hovered.
    pub context_menu: Vec<Locator>,
    pub rename_option: Vec<Locator>,
    pub delete_option: Vec<Locator>,
    /// Confirmation dialog button; not every release shows the dialog.
    pub delete_confirm: Vec<Locator>,
    pub title_input: Vec<Locator>,
}

impl Default for DashboardSelectors {
    fn default() -> Self {
        Self {
            sidebar_links: locators(&["a.sidebarListLink---e8cba", r#"nav a[href*="/dashboards/"]"#]),
            new_dashboard: locators(&[
                r#"button:has-text("New dashboard")"#,
                r#"[data-testid="create-dashboard"]"#,
                r#"button:has-text("New Dashboard")"#,
                r#"a:has-text("Create Dashboard")"#,
                r#"button:has-text("Add Dashboard")"#,
            ]),
            context_menu: locators(&[
                "button.openContextMenuButton---_8f4e",
                r#"button[aria-label*="menu"]"#,
                r#"button[aria-label*="options"]"#,
                r#"[data-testid*="menu"]"#,
                "button.more-options",
            ]),
            rename_option: locators(&[
                r#"span.menuItemLabel---f5516:has-text("Rename")"#,
                r#"[role="menuitem"]:has-text("Rename")"#,
                r#"button:has-text("Rename")"#,
                r#"a:has-text("Rename")"#,
                r#"[data-testid*="rename"]"#,
            ]),
            delete_option: locators(&[
                r#"span.menuItemLabel---f5516:has-text("Delete")"#,
                r#"[role="menuitem"]:has-text("Delete")"#,
                r#"[data-testid*="delete"]"#,
            ]),
            delete_confirm: locators(&[
                r#"[role="dialog"] button:has-text("Delete")"#,
                r#"button:has-text("Delete")"#,
            ]),
            title_input: locators(&[
                r#"input[value*="Dashboard"]"#,
                r#"input[placeholder*="dashboard"]"#,
                r#"[contenteditable="true"]"#,
                r#"input[type="text"]"#,
                "textarea",
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetSelectors {
    pub add_widget: Vec<Locator>,
    pub integration: Vec<Locator>,
    /// Metric tiles or buttons, clicked when no metric `<select>` is found.
    pub metric: Vec<Locator>,
    /// Native `<select>` elements for the metric.
    pub metric_select: Vec<Locator>,
    pub time_period: Vec<Locator>,
    pub time_period_select: Vec<Locator>,
    /// Ticket status filter.
    pub status: Vec<Locator>,
    pub status_select: Vec<Locator>,
    pub add_filter: Vec<Locator>,
}

impl Default for WidgetSelectors {
    fn default() -> Self {
        Self {
            add_widget: locators(&[
                r#"button:has-text("Add widget")"#,
                r#"[data-testid*="add-widget"]"#,
            ]),
            integration: locators(&[
                r#"a[data-service-name="{service}"]"#,
                r#"a[href*="{service}"]"#,
                r#"a:has-text("{integration}")"#,
                r#"button:has-text("{integration}")"#,
                r#"div:has-text("{integration}")"#,
            ]),
            metric: locators(&[
                r#"span.title---_3e44:has-text("{metric}")"#,
                r#"button:has-text("{metric}")"#,
                r#"a:has-text("{metric}")"#,
                r#"div:has-text("{metric}")"#,
            ]),
            metric_select: locators(&[
                r#"select[name*="metric"]"#,
                r#"select[name*="measurement"]"#,
                ".metric-select",
                ".measurement-select",
            ]),
            time_period: locators(&[
                r#"button:has-text("{period}")"#,
                r#"[role="option"]:has-text("{period}")"#,
                r#"li:has-text("{period}")"#,
            ]),
            time_period_select: locators(&[
                r#"select[name*="time"]"#,
                r#"select[name*="range"]"#,
                r#"select[name*="period"]"#,
                ".time-range-select",
            ]),
            status: locators(&[
                r#"button:has-text("{status}")"#,
                r#"[role="option"]:has-text("{status}")"#,
                r#"label:has-text("{status}")"#,
            ]),
            status_select: locators(&[
                r#"select[name*="status"]"#,
                r#"select[name*="ticket"]"#,
                ".status-select",
            ]),
            add_filter: locators(&[
                r#"button:has-text("Add filter")"#,
                ".add-filter",
                r#"[data-testid*="filter"]"#,
            ]),
        }
    }
}
