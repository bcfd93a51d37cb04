use super::ConfigError;
use crate::resolution::RetryPolicy;
use crate::selectors::SelectorCatalog;
use crate::session::{DEFAULT_PREFIX, DEFAULT_SUFFIX};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashpilotConfig {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub selectors: SelectorCatalog,
}

impl DashpilotConfig {
    /// Apply `HEADLESS_MODE`, `TIMEOUT_MS` and `GECKOBOARD_BASE_URL` from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("HEADLESS_MODE") {
            self.browser.headless = value.trim().eq_ignore_ascii_case("true");
        }
        if let Some(value) = lookup("TIMEOUT_MS") {
            match value.trim().parse::<u64>() {
                Ok(ms) => self.browser.navigation_timeout_ms = ms,
                Err(_) => tracing::warn!("Ignoring invalid TIMEOUT_MS '{}'", value),
            }
        }
        if let Some(value) = lookup("GECKOBOARD_BASE_URL")
            && !value.trim().is_empty()
        {
            self.target.base_url = value.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.naming.prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "naming.prefix must not be empty".to_string(),
            ));
        }
        if self.resolution.budget_ms == 0 {
            return Err(ConfigError::Invalid(
                "resolution.budget_ms must be positive".to_string(),
            ));
        }
        let empty = self.selectors.empty_lists();
        if !empty.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "selector lists must not be empty: {}",
                empty.join(", ")
            )));
        }
        self.target.login_url()?;
        self.target.app_url()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_app_url")]
    pub app_url: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// URL fragment that identifies a dashboard's edit page.
    #[serde(default = "default_edit_marker")]
    pub edit_marker: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            app_url: default_app_url(),
            login_path: default_login_path(),
            edit_marker: default_edit_marker(),
        }
    }
}

impl TargetConfig {
    pub fn login_url(&self) -> Result<String, ConfigError> {
        let base = url::Url::parse(&self.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        let url = base
            .join(&self.login_path)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.login_path, e)))?;
        Ok(url.to_string())
    }

    pub fn app_url(&self) -> Result<String, ConfigError> {
        url::Url::parse(&self.app_url)
            .map(|u| u.to_string())
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.app_url, e)))
    }
}

fn default_base_url() -> String {
    "https://www.geckoboard.com".to_string()
}

fn default_app_url() -> String {
    "https://app.geckoboard.com/".to_string()
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_edit_marker() -> String {
    "/edit/dashboards/".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub headless: bool,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: default_window_width(),
            window_height: default_window_height(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            chrome_executable: None,
        }
    }
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_navigation_timeout_ms() -> u64 {
    30000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Total time one logical element may take to resolve.
    #[serde(default = "default_budget_ms")]
    pub budget_ms: u64,
    /// Budget for elements that may legitimately be absent.
    #[serde(default = "default_short_budget_ms")]
    pub short_budget_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Pause after state-changing clicks.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            budget_ms: default_budget_ms(),
            short_budget_ms: default_short_budget_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl ResolutionConfig {
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }

    pub fn short_budget(&self) -> Duration {
        Duration::from_millis(self.short_budget_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

fn default_budget_ms() -> u64 {
    10000
}

fn default_short_budget_ms() -> u64 {
    3000
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_settle_ms() -> u64 {
    1500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_suffix")]
    pub suffix: String,
    /// Regexes for test dashboards left behind by older runs.
    #[serde(default = "default_legacy_patterns")]
    pub legacy_patterns: Vec<String>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            suffix: default_suffix(),
            legacy_patterns: default_legacy_patterns(),
        }
    }
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_suffix() -> String {
    DEFAULT_SUFFIX.to_string()
}

fn default_legacy_patterns() -> Vec<String> {
    vec![r"^Dashboard \d+$".to_string(), "Zendesk Test".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Ask once before deleting stale test dashboards.
    #[serde(default = "default_true")]
    pub confirm_cleanup: bool,
    /// Offer to delete the dashboards created by this run once it finishes.
    #[serde(default)]
    pub teardown_created: bool,
    #[serde(default)]
    pub widget: WidgetConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            confirm_cleanup: true,
            teardown_created: false,
            widget: WidgetConfig::default(),
        }
    }
}

/// What the widget should show. The values fill the `{placeholder}`s of
/// `selectors.widget` and are the option texts looked for in native selects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetConfig {
    #[serde(default = "default_integration")]
    pub integration: String,
    /// `data-service-name` of the integration tile, if it has one.
    #[serde(default = "default_integration_service")]
    pub integration_service: Option<String>,
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default = "default_time_period")]
    pub time_period: Option<String>,
    /// Ticket status to filter on; `None` skips the step.
    #[serde(default = "default_status")]
    pub status: Option<String>,
    #[serde(default = "default_true")]
    pub add_filter: bool,
    /// Other option texts accepted for a value, keyed by the value
    /// (case-insensitive).
    #[serde(default = "default_option_aliases")]
    pub option_aliases: BTreeMap<String, Vec<String>>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            integration: default_integration(),
            integration_service: default_integration_service(),
            metric: default_metric(),
            time_period: default_time_period(),
            status: default_status(),
            add_filter: true,
            option_aliases: default_option_aliases(),
        }
    }
}

impl WidgetConfig {
    /// `value` followed by its aliases, for matching native select options.
    pub fn choices(&self, value: &str) -> Vec<String> {
        let mut choices = vec![value.to_string()];
        if let Some((_, aliases)) = self
            .option_aliases
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(value))
        {
            choices.extend(aliases.iter().cloned());
        }
        choices
    }
}

fn default_integration() -> String {
    "Zendesk Support".to_string()
}

fn default_integration_service() -> Option<String> {
    Some("zendesk3".to_string())
}

fn default_metric() -> String {
    "First reply time".to_string()
}

fn default_time_period() -> Option<String> {
    Some("Today".to_string())
}

fn default_status() -> Option<String> {
    Some("Solved".to_string())
}

fn default_option_aliases() -> BTreeMap<String, Vec<String>> {
    let entry = |value: &str, aliases: &[&str]| {
        (
            value.to_string(),
            aliases.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
        )
    };
    [
        entry("First reply time", &["First reply", "Reply time", "Response time"]),
        entry("Today", &["24 hour", "1 day"]),
        entry("Solved", &["Closed", "Resolved"]),
    ]
    .into_iter()
    .collect()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    #[serde(default = "default_screenshots")]
    pub screenshots: bool,
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default = "default_summary_file")]
    pub summary_file: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            screenshots: default_screenshots(),
            screenshot_dir: default_screenshot_dir(),
            log_file: default_log_file(),
            summary_file: default_summary_file(),
        }
    }
}

fn default_screenshots() -> bool {
    true
}

fn default_screenshot_dir() -> PathBuf {
    PathBuf::from("screenshots")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("dashpilot-log.txt")
}

fn default_summary_file() -> PathBuf {
    PathBuf::from("dashpilot-url.txt")
}
