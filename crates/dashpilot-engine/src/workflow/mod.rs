pub mod actions;
pub mod login;
pub mod orchestrator;
pub mod widget;

use crate::dashboard::{CleanupReport, DashboardState};
use serde::Serialize;
use std::fmt;

pub use actions::{Attempt, StepActions};
pub use orchestrator::Workflow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Login,
    Survey,
    Cleanup,
    Create,
    Rename,
    AddWidget,
    ConfigureWidget,
    Finalize,
    Teardown,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Login => "login",
            Step::Survey => "survey",
            Step::Cleanup => "cleanup",
            Step::Create => "create",
            Step::Rename => "rename",
            Step::AddWidget => "add-widget",
            Step::ConfigureWidget => "configure-widget",
            Step::Finalize => "finalize",
            Step::Teardown => "teardown",
        };
        write!(f, "{}", name)
    }
}

/// What a run does. Finalize always runs after the listed steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// The full create/rename/widget workflow.
    Run,
    /// Log in and report the dashboards without changing anything.
    Check,
    /// Log in and delete stale test dashboards.
    Cleanup,
}

impl Mode {
    pub fn steps(&self) -> &'static [Step] {
        match self {
            Mode::Run => &[
                Step::Login,
                Step::Cleanup,
                Step::Create,
                Step::Rename,
                Step::AddWidget,
                Step::ConfigureWidget,
            ],
            Mode::Check => &[Step::Login, Step::Survey],
            Mode::Cleanup => &[Step::Login, Step::Cleanup],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded(Option<String>),
    Failed(String),
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: Step,
    #[serde(flatten)]
    pub status: StepStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub name: String,
    pub state: DashboardState,
    pub test_dashboard: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub session_id: String,
    pub mode: Mode,
    pub steps: Vec<StepReport>,
    pub dashboard: Option<String>,
    pub url: Option<String>,
    pub created: Vec<String>,
    pub cleanup: Option<CleanupReport>,
    pub dashboards: Vec<DashboardSummary>,
    pub aborted: bool,
}

impl RunReport {
    pub fn new(session_id: &str, mode: Mode) -> Self {
        Self {
            session_id: session_id.to_string(),
            mode,
            steps: Vec::new(),
            dashboard: None,
            url: None,
            created: Vec::new(),
            cleanup: None,
            dashboards: Vec::new(),
            aborted: false,
        }
    }

    pub fn push(&mut self, step: Step, status: StepStatus) {
        self.steps.push(StepReport { step, status });
    }

    pub fn status_of(&self, step: Step) -> Option<&StepStatus> {
        self.steps.iter().find(|s| s.step == step).map(|s| &s.status)
    }

    pub fn first_failure(&self) -> Option<(Step, &str)> {
        self.steps.iter().find_map(|s| match &s.status {
            StepStatus::Failed(reason) => Some((s.step, reason.as_str())),
            _ => None,
        })
    }

    pub fn is_success(&self) -> bool {
        self.first_failure().is_none()
    }

    /// Plain-text summary for the terminal.
    pub fn render(&self) -> String {
        let mut out = format!("Session {} ({:?})\n", self.session_id, self.mode);
        for s in &self.steps {
            let line = match &s.status {
                StepStatus::Succeeded(Some(detail)) => format!("  [ok]   {}: {}", s.step, detail),
                StepStatus::Succeeded(None) => format!("  [ok]   {}", s.step),
                StepStatus::Failed(reason) => format!("  [FAIL] {}: {}", s.step, reason),
                StepStatus::Skipped => format!("  [skip] {}", s.step),
            };
            out.push_str(&line);
            out.push('\n');
        }
        for d in &self.dashboards {
            let marker = if d.test_dashboard { " (test)" } else { "" };
            out.push_str(&format!("  - {} [{:?}]{}\n", d.name, d.state, marker));
        }
        if let Some(name) = &self.dashboard {
            out.push_str(&format!("Dashboard: {}\n", name));
        }
        if let Some(url) = &self.url {
            out.push_str(&format!("URL: {}\n", url));
        }
        out
    }
}
