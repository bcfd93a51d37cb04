//! Runs the steps of one session in order against a single page.

use super::actions::StepActions;
use super::{DashboardSummary, Mode, RunReport, Step, StepStatus, login, widget};
use crate::artifacts::{RunSummary, ScreenshotRecorder};
use crate::config::{Credentials, DashpilotConfig};
use crate::confirm::{ConfirmationGate, HumanInput};
use crate::dashboard::DashboardLifecycle;
use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::resolution::SelectorResolver;
use crate::runlog::SharedLog;
use crate::session::SessionContext;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Owns the driver, the session and the dashboard state for one run.
pub struct Workflow<D: Driver> {
    driver: D,
    lifecycle: DashboardLifecycle,
    actions: StepActions,
    session: SessionContext,
    config: DashpilotConfig,
    credentials: Credentials,
    log: SharedLog,
    screenshots: Option<ScreenshotRecorder>,
    cancel: CancellationToken,
    /// The dashboard this run is working on.
    dashboard: Option<String>,
}

impl<D: Driver> Workflow<D> {
    pub fn new(
        driver: D,
        config: DashpilotConfig,
        credentials: Credentials,
        input: Box<dyn HumanInput>,
        log: SharedLog,
        session: SessionContext,
        cancel: CancellationToken,
    ) -> Self {
        let resolver = SelectorResolver::new(config.resolution.poll_interval(), cancel.clone());
        let gate = ConfirmationGate::new(input, log.clone(), cancel.clone());
        let lifecycle = DashboardLifecycle::from_config(&config, resolver.clone(), gate, log.clone());
        let actions = StepActions::new(
            resolver,
            config.retry.policy(),
            config.resolution.budget(),
            config.resolution.short_budget(),
            log.clone(),
        );
        let screenshots = config.artifacts.screenshots.then(|| {
            ScreenshotRecorder::new(config.artifacts.screenshot_dir.clone(), session.session_id())
        });

        Self {
            driver,
            lifecycle,
            actions,
            session,
            config,
            credentials,
            log,
            screenshots,
            cancel,
            dashboard: None,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn lifecycle(&self) -> &DashboardLifecycle {
        &self.lifecycle
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Run the steps of `mode`, stopping at the first failure. Finalize runs
    /// regardless.
    pub async fn run(&mut self, mode: Mode) -> RunReport {
        let mut report = RunReport::new(self.session.session_id(), mode);
        self.log.record(&format!(
            "Session {} starting in {:?} mode",
            self.session.session_id(),
            mode
        ));

        let mut failed = false;
        for &step in mode.steps() {
            if failed {
                report.push(step, StepStatus::Skipped);
                continue;
            }
            info!("Step: {}", step);
            self.log.record(&format!("STEP {}", step));
            match self.execute(step, &mut report).await {
                Ok(detail) => {
                    self.log.record(&format!("STEP {} ok", step));
                    report.push(step, StepStatus::Succeeded(detail));
                }
                Err(e) => {
                    error!("Step {} failed: {}", step, e);
                    self.log.record(&format!("STEP {} failed: {}", step, e));
                    report.aborted |= e.is_abort();
                    report.push(step, StepStatus::Failed(e.to_string()));
                    failed = true;
                }
            }
        }

        match self.finalize(&mut report).await {
            Ok(detail) => report.push(Step::Finalize, StepStatus::Succeeded(detail)),
            Err(e) => {
                error!("Finalize failed: {}", e);
                self.log.record(&format!("STEP finalize failed: {}", e));
                report.push(Step::Finalize, StepStatus::Failed(e.to_string()));
            }
        }

        if mode == Mode::Run && self.config.workflow.teardown_created && !self.cancel.is_cancelled() {
            match self.teardown(&mut report).await {
                Ok(detail) => report.push(Step::Teardown, StepStatus::Succeeded(detail)),
                Err(e) => {
                    warn!("Teardown failed: {}", e);
                    report.aborted |= e.is_abort();
                    report.push(Step::Teardown, StepStatus::Failed(e.to_string()));
                }
            }
        }

        report.created = self.session.created_names().to_vec();
        report.dashboard = self.dashboard.clone();
        report
    }

    async fn execute(&mut self, step: Step, report: &mut RunReport) -> Result<Option<String>> {
        match step {
            Step::Login => {
                let detail = login::log_in(
                    &mut self.driver,
                    &mut self.lifecycle,
                    &self.actions,
                    &self.config,
                    &self.credentials,
                    &self.log,
                )
                .await?;
                self.screenshot("after login").await;
                Ok(Some(detail))
            }
            Step::Survey => {
                self.lifecycle.list(&mut self.driver).await?;
                report.dashboards = self
                    .lifecycle
                    .dashboards()
                    .iter()
                    .map(|r| DashboardSummary {
                        name: r.name.clone(),
                        state: r.state,
                        test_dashboard: self.session.is_deletable(&r.name),
                    })
                    .collect();
                let stale = report.dashboards.iter().filter(|d| d.test_dashboard).count();
                for d in &report.dashboards {
                    self.log.record(&format!(
                        "Dashboard: {} [{:?}]{}",
                        d.name,
                        d.state,
                        if d.test_dashboard { " (test)" } else { "" }
                    ));
                }
                Ok(Some(format!(
                    "{} dashboard(s), {} test dashboard(s)",
                    report.dashboards.len(),
                    stale
                )))
            }
            Step::Cleanup => {
                let cleanup = self
                    .lifecycle
                    .cleanup(
                        &mut self.driver,
                        &mut self.session,
                        self.config.workflow.confirm_cleanup,
                    )
                    .await?;
                let detail = if cleanup.declined {
                    "declined by operator".to_string()
                } else {
                    format!("deleted {} of {}", cleanup.deleted.len(), cleanup.attempted)
                };
                report.cleanup = Some(cleanup);
                Ok(Some(detail))
            }
            Step::Create => {
                let name = self
                    .lifecycle
                    .create(&mut self.driver, &mut self.session)
                    .await?;
                self.dashboard = Some(name.clone());
                self.screenshot("dashboard created").await;
                Ok(Some(name))
            }
            Step::Rename => {
                let old = self.current_dashboard()?;
                let new = self.session.new_name();
                self.lifecycle
                    .rename(&mut self.driver, &mut self.session, &old, &new)
                    .await?;
                self.dashboard = Some(new.clone());
                self.screenshot("dashboard renamed").await;
                Ok(Some(format!("{} -> {}", old, new)))
            }
            Step::AddWidget => {
                let name = self.current_dashboard()?;
                let detail = widget::add_widget(
                    &mut self.driver,
                    self.lifecycle.gate_mut(),
                    &self.actions,
                    &self.config,
                    &self.log,
                    &name,
                )
                .await?;
                self.screenshot("widget added").await;
                Ok(Some(detail))
            }
            Step::ConfigureWidget => {
                let detail = widget::configure_widget(
                    &mut self.driver,
                    self.lifecycle.gate_mut(),
                    &self.actions,
                    &self.config,
                    &self.log,
                )
                .await?;
                self.screenshot("widget configured").await;
                Ok(Some(detail))
            }
            Step::Finalize | Step::Teardown => Err(Error::InvariantViolation(format!(
                "{} is not a plan step",
                step
            ))),
        }
    }

    fn current_dashboard(&self) -> Result<String> {
        self.dashboard
            .clone()
            .ok_or_else(|| Error::InvariantViolation("no dashboard was created in this run".to_string()))
    }

    /// Record where the run ended up. Driver failures here are logged, not
    /// raised; only the summary file write can fail this step.
    async fn finalize(&mut self, report: &mut RunReport) -> Result<Option<String>> {
        self.log.record("STEP finalize");
        self.screenshot("final state").await;

        match self.driver.current_url().await {
            Ok(url) => {
                self.log.record(&format!("Final URL: {}", url));
                report.url = Some(url);
            }
            Err(e) => self.log.record(&format!("Could not read the final URL: {}", e)),
        }

        let created = self.session.created_names();
        if created.is_empty() {
            self.log.record("No dashboards created in this session");
        } else {
            self.log.record(&format!("Created this session: {}", created.join(", ")));
        }

        let Some(name) = self.dashboard.clone() else {
            return Ok(None);
        };
        let summary = RunSummary {
            dashboard: name,
            url: report.url.clone().unwrap_or_default(),
            created_at: Utc::now(),
        };
        let path = &self.config.artifacts.summary_file;
        summary.write_to(path).await?;
        self.log.record(&format!("Wrote run summary to {}", path.display()));
        Ok(Some(path.display().to_string()))
    }

    async fn teardown(&mut self, report: &mut RunReport) -> Result<Option<String>> {
        let created = self.session.created_names().to_vec();
        if created.is_empty() {
            return Ok(Some("nothing to remove".to_string()));
        }
        let prompt = format!(
            "Delete the {} dashboard(s) created in this run ({})?",
            created.len(),
            created.join(", ")
        );
        if !self.lifecycle.gate_mut().confirm(&prompt).await? {
            return Ok(Some("kept by operator".to_string()));
        }
        let purged = self
            .lifecycle
            .purge_created(&mut self.driver, &mut self.session)
            .await?;
        let detail = format!("deleted {} of {}", purged.deleted.len(), purged.attempted);
        if purged.deleted.iter().any(|d| Some(d) == self.dashboard.as_ref()) {
            self.dashboard = None;
        }
        report.cleanup = Some(purged);
        Ok(Some(detail))
    }

    /// Screenshot failures never fail a step.
    async fn screenshot(&mut self, description: &str) {
        let Some(recorder) = self.screenshots.as_mut() else {
            return;
        };
        if let Err(e) = recorder.ensure_dir().await {
            warn!("Cannot create screenshot dir {}: {}", recorder.dir().display(), e);
            return;
        }
        let path = recorder.next_path(description);
        match self.driver.screenshot(&path).await {
            Ok(()) => self.log.record(&format!("Screenshot: {}", path.display())),
            Err(e) => self.log.record(&format!("Screenshot '{}' failed: {}", description, e)),
        }
    }

    /// Close the browser.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.driver.close().await {
            warn!("Failed to close the browser: {}", e);
        }
        self.log.record("Session closed");
    }
}
