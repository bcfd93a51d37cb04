//! Create, switch, rename and delete dashboards through the page.
//!
//! Every transition is a short sequence of resolved clicks. When a step cannot
//! be resolved, or its result cannot be seen in the next listing, the operator
//! is asked whether the transition happened and state follows the answer.
//! Safety checks on delete run before the driver is touched at all.

use super::record::{DashboardState, ListedDashboard, Origin};
use super::set::DashboardSet;
use crate::config::{DashpilotConfig, ResolutionConfig};
use crate::confirm::ConfirmationGate;
use crate::driver::{Driver, DriverError, ElementId, ElementInfo};
use crate::error::{Error, Result};
use crate::resolution::{
    ActionOutcome, ListOutcome, Locator, RetryPolicy, SelectorResolver, join_attempts,
    retry_driver,
};
use crate::runlog::SharedLog;
use crate::selectors::{DashboardSelectors, candidates};
use crate::session::SessionContext;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct Timing {
    /// Budget for elements that must be present.
    pub budget: Duration,
    /// Budget for elements that may be absent (e.g. a confirmation dialog).
    pub short_budget: Duration,
    pub settle: Duration,
}

impl From<&ResolutionConfig> for Timing {
    fn from(config: &ResolutionConfig) -> Self {
        Self {
            budget: config.budget(),
            short_budget: config.short_budget(),
            settle: config.settle(),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::from(&ResolutionConfig::default())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub attempted: usize,
    pub deleted: Vec<String>,
    pub failed: Vec<(String, String)>,
    /// The operator declined the batch confirmation.
    pub declined: bool,
}

/// A step inside a transition that could not be carried out.
enum StepFailure {
    Missing { step: String, detail: String },
    Cancelled,
}

impl From<(&str, DriverError)> for StepFailure {
    fn from((step, e): (&str, DriverError)) -> Self {
        StepFailure::Missing {
            step: step.to_string(),
            detail: e.to_string(),
        }
    }
}

fn exact_name(name: &str) -> impl Fn(&ElementInfo) -> bool + '_ {
    move |e| e.text.trim() == name
}

/// Per-row controls belong to the row whose text is the dashboard name.
fn in_row(name: &str) -> impl Fn(&ElementInfo) -> bool + '_ {
    move |e| match &e.container_text {
        Some(text) => text.trim() == name,
        None => true,
    }
}

pub struct DashboardLifecycle {
    dashboards: DashboardSet,
    selectors: DashboardSelectors,
    resolver: SelectorResolver,
    gate: ConfirmationGate,
    log: SharedLog,
    timing: Timing,
    retry: RetryPolicy,
}

impl DashboardLifecycle {
    pub fn new(
        selectors: DashboardSelectors,
        resolver: SelectorResolver,
        gate: ConfirmationGate,
        log: SharedLog,
    ) -> Self {
        Self {
            dashboards: DashboardSet::new(),
            selectors,
            resolver,
            gate,
            log,
            timing: Timing::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(
        config: &DashpilotConfig,
        resolver: SelectorResolver,
        gate: ConfirmationGate,
        log: SharedLog,
    ) -> Self {
        Self::new(config.selectors.dashboard.clone(), resolver, gate, log)
            .with_timing(Timing::from(&config.resolution))
            .with_retry(config.retry.policy())
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn dashboards(&self) -> &DashboardSet {
        &self.dashboards
    }

    pub fn gate_mut(&mut self) -> &mut ConfirmationGate {
        &mut self.gate
    }

    /// Read the sidebar and merge it into the record set. Returns the names as
    /// currently rendered.
    pub async fn list<D: Driver + ?Sized>(&mut self, driver: &mut D) -> Result<Vec<String>> {
        let listing = self.observe(driver).await?;
        let added = self.dashboards.reconcile(&listing);
        if !added.is_empty() {
            debug!("Newly listed dashboards: {:?}", added);
        }
        Ok(listing.into_iter().map(|l| l.name).collect())
    }

    async fn observe<D: Driver + ?Sized>(&self, driver: &mut D) -> Result<Vec<ListedDashboard>> {
        let list = candidates("dashboard list", &self.selectors.sidebar_links);
        match self.resolver.collect(driver, &list, self.timing.budget).await {
            ListOutcome::Found { elements, .. } => Ok(elements
                .into_iter()
                .filter(|e| !e.text.trim().is_empty())
                .map(|e| ListedDashboard {
                    name: e.text.trim().to_string(),
                    active: e.active,
                })
                .collect()),
            ListOutcome::Empty(tried) => {
                self.log.record(&format!(
                    "No dashboards listed (tried {})",
                    join_attempts(&tried)
                ));
                Ok(Vec::new())
            }
            ListOutcome::TimedOut(locator) => {
                warn!("Dashboard listing timed out on {}", locator);
                Ok(Vec::new())
            }
            ListOutcome::Cancelled => Err(Error::UserAbort(
                "cancelled while listing dashboards".to_string(),
            )),
        }
    }

    /// Create a dashboard and return the name the application gave it.
    pub async fn create<D: Driver + ?Sized>(
        &mut self,
        driver: &mut D,
        session: &mut SessionContext,
    ) -> Result<String> {
        let before: HashSet<String> = self.dashboards.names().into_iter().collect();
        self.log.record("Creating a new dashboard");

        let mut manual = false;
        match self.attempt_create(driver).await {
            Ok(()) => driver.settle(self.timing.settle).await,
            Err(failure) => {
                self.escalate(
                    failure,
                    "create a new dashboard",
                    "Please create one in the browser. Was a new dashboard created?",
                )
                .await?;
                manual = true;
            }
        }

        let listing = self.list(driver).await?;
        let detected = match self.dashboards.active() {
            Some(record) if !before.contains(&record.name) => Some(record.name.clone()),
            _ => {
                let fresh: Vec<&String> = listing.iter().filter(|n| !before.contains(*n)).collect();
                match fresh.as_slice() {
                    [only] => Some((*only).clone()),
                    _ => None,
                }
            }
        };

        let name = match detected {
            Some(name) => name,
            None => {
                if !manual
                    && !self
                        .gate
                        .confirm("Could not detect the new dashboard in the sidebar. Was a new dashboard created?")
                        .await?
                {
                    return Err(Error::SelectorExhausted {
                        action: "create a new dashboard".to_string(),
                        detail: "no new dashboard appeared in the listing".to_string(),
                    });
                }
                let answer = self
                    .gate
                    .describe("What is the new dashboard's current name?")
                    .await?;
                if answer.is_empty() {
                    return Err(Error::UserAbort(
                        "no name given for the new dashboard".to_string(),
                    ));
                }
                answer
            }
        };

        self.dashboards.register_created(&name);
        session.record(&name);
        self.dashboards.check_single_active()?;
        self.log.record(&format!("Created dashboard '{}'", name));
        Ok(name)
    }

    async fn attempt_create<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
    ) -> std::result::Result<(), StepFailure> {
        let button = self
            .locate(driver, "new dashboard button", &self.selectors.new_dashboard, self.timing.budget, |_| true)
            .await?;
        self.click(driver, "new dashboard button", button.id).await
    }

    /// Make `name` the active dashboard.
    pub async fn switch_active<D: Driver + ?Sized>(
        &mut self,
        driver: &mut D,
        name: &str,
    ) -> Result<()> {
        let record = self
            .dashboards
            .get(name)
            .ok_or_else(|| Error::UnknownDashboard(name.to_string()))?;
        match record.state {
            DashboardState::Listed | DashboardState::Inactive => {}
            DashboardState::Active => {
                return Err(Error::InvariantViolation(format!(
                    "'{}' is already the active dashboard",
                    name
                )));
            }
            state => {
                return Err(Error::InvariantViolation(format!(
                    "cannot switch to '{}' while it is {:?}",
                    name, state
                )));
            }
        }

        self.log.record(&format!("Switching to dashboard '{}'", name));
        let transition = format!("switch to '{}'", name);
        match self.attempt_switch(driver, name).await {
            Ok(()) => {
                driver.settle(self.timing.settle).await;
                self.list(driver).await?;
                let switched = self.dashboards.get(name).is_some_and(|r| r.is_active());
                if !switched
                    && !self
                        .gate
                        .confirm(&format!("Is '{}' now the active dashboard?", name))
                        .await?
                {
                    return Err(Error::SelectorExhausted {
                        action: transition,
                        detail: "the sidebar does not show it as active".to_string(),
                    });
                }
            }
            Err(failure) => {
                let ask = format!(
                    "Please open '{}' in the browser. Is it now the active dashboard?",
                    name
                );
                self.escalate(failure, &transition, &ask).await?;
            }
        }

        self.dashboards.mark_active(name);
        self.dashboards.check_single_active()?;
        self.log.record(&format!("Active dashboard is now '{}'", name));
        Ok(())
    }

    async fn attempt_switch<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        name: &str,
    ) -> std::result::Result<(), StepFailure> {
        let link = self
            .locate(driver, "dashboard link", &self.selectors.sidebar_links, self.timing.budget, exact_name(name))
            .await?;
        self.click(driver, "dashboard link", link.id).await
    }

    /// Rename `old` to `new`. On failure `old` stays authoritative.
    pub async fn rename<D: Driver + ?Sized>(
        &mut self,
        driver: &mut D,
        session: &mut SessionContext,
        old: &str,
        new: &str,
    ) -> Result<()> {
        let new = new.trim();
        if new.is_empty() {
            return Err(Error::InvariantViolation("new name must not be empty".to_string()));
        }
        let record = self
            .dashboards
            .get(old)
            .ok_or_else(|| Error::UnknownDashboard(old.to_string()))?;
        if !record.state.is_settled() {
            return Err(Error::InvariantViolation(format!(
                "cannot rename '{}' while it is {:?}",
                old, record.state
            )));
        }
        if old == new {
            return Ok(());
        }
        if self.dashboards.contains(new) {
            return Err(Error::InvariantViolation(format!(
                "a dashboard named '{}' already exists",
                new
            )));
        }

        let previous = record.state;
        let origin = record.origin;
        self.dashboards.set_state(
            old,
            DashboardState::Renaming {
                was_active: previous.is_active(),
            },
        );
        self.log.record(&format!("Renaming '{}' to '{}'", old, new));

        let outcome = self.finish_rename(driver, old, new).await;
        if let Err(e) = outcome {
            self.dashboards.set_state(old, previous);
            self.log.record(&format!("Rename of '{}' failed: {}", old, e));
            return Err(e);
        }

        self.dashboards.rename(old, new);
        self.dashboards.set_state(new, previous);
        if origin == Origin::CreatedThisSession {
            session.rename_created(old, new);
        }
        self.list(driver).await?;
        self.log.record(&format!("Renamed '{}' to '{}'", old, new));
        Ok(())
    }

    async fn finish_rename<D: Driver + ?Sized>(
        &mut self,
        driver: &mut D,
        old: &str,
        new: &str,
    ) -> Result<()> {
        let transition = format!("rename '{}' to '{}'", old, new);
        match self.attempt_rename(driver, old, new).await {
            Ok(()) => {
                driver.settle(self.timing.settle).await;
                let listing = self.observe(driver).await?;
                let renamed = listing.iter().any(|l| l.name == new)
                    && !listing.iter().any(|l| l.name == old);
                if !renamed
                    && !self
                        .gate
                        .confirm(&format!("Was '{}' renamed to '{}'?", old, new))
                        .await?
                {
                    return Err(Error::SelectorExhausted {
                        action: transition,
                        detail: "the new name did not appear in the sidebar".to_string(),
                    });
                }
                Ok(())
            }
            Err(failure) => {
                let ask = format!(
                    "Please rename '{}' to '{}' in the browser. Is it renamed?",
                    old, new
                );
                self.escalate(failure, &transition, &ask).await
            }
        }
    }

    async fn attempt_rename<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        old: &str,
        new: &str,
    ) -> std::result::Result<(), StepFailure> {
        self.open_row_menu(driver, old).await?;
        let option = self
            .locate(driver, "rename option", &self.selectors.rename_option, self.timing.budget, |_| true)
            .await?;
        self.click(driver, "rename option", option.id).await?;

        let input = self
            .locate(driver, "title input", &self.selectors.title_input, self.timing.budget, |_| true)
            .await?;
        retry_driver!(self.retry, "fill title", driver.fill(input.id, new))
            .map_err(|e| StepFailure::from(("title input", e)))?;
        retry_driver!(self.retry, "commit title", driver.press_key("Enter"))
            .map_err(|e| StepFailure::from(("title input", e)))
    }

    /// Delete `name`.
    ///
    /// Rejected before any driver call when the name is not a test dashboard
    /// or when it is the active dashboard.
    pub async fn delete<D: Driver + ?Sized>(
        &mut self,
        driver: &mut D,
        session: &mut SessionContext,
        name: &str,
    ) -> Result<()> {
        if !session.is_deletable(name) {
            return Err(Error::NamingSafetyViolation(name.to_string()));
        }
        let record = self
            .dashboards
            .get(name)
            .ok_or_else(|| Error::UnknownDashboard(name.to_string()))?;
        if record.is_active() {
            return Err(Error::InvariantViolation(format!(
                "'{}' is the active dashboard; switch away before deleting it",
                name
            )));
        }
        if !record.state.is_settled() {
            return Err(Error::InvariantViolation(format!(
                "cannot delete '{}' while it is {:?}",
                name, record.state
            )));
        }

        let previous = record.state;
        self.dashboards.set_state(name, DashboardState::Deleting);
        self.log.record(&format!("Deleting dashboard '{}'", name));

        if let Err(e) = self.finish_delete(driver, name).await {
            self.dashboards.set_state(name, previous);
            self.log.record(&format!("Delete of '{}' failed: {}", name, e));
            return Err(e);
        }

        self.dashboards.remove(name);
        session.forget(name);
        self.log.record(&format!("Deleted dashboard '{}'", name));
        Ok(())
    }

    async fn finish_delete<D: Driver + ?Sized>(&mut self, driver: &mut D, name: &str) -> Result<()> {
        let transition = format!("delete '{}'", name);
        match self.attempt_delete(driver, name).await {
            Ok(()) => {
                driver.settle(self.timing.settle).await;
                let listing = self.observe(driver).await?;
                if listing.iter().any(|l| l.name == name)
                    && !self
                        .gate
                        .confirm(&format!("'{}' is still listed. Has it been deleted?", name))
                        .await?
                {
                    return Err(Error::SelectorExhausted {
                        action: transition,
                        detail: "the dashboard is still listed".to_string(),
                    });
                }
                Ok(())
            }
            Err(failure) => {
                let ask = format!("Please delete '{}' in the browser. Has it been deleted?", name);
                self.escalate(failure, &transition, &ask).await
            }
        }
    }

    async fn attempt_delete<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        name: &str,
    ) -> std::result::Result<(), StepFailure> {
        self.open_row_menu(driver, name).await?;
        let option = self
            .locate(driver, "delete option", &self.selectors.delete_option, self.timing.budget, |_| true)
            .await?;
        self.click(driver, "delete option", option.id).await?;

        let confirm = candidates("delete confirmation", &self.selectors.delete_confirm);
        match self
            .resolver
            .resolve(driver, &confirm, self.timing.short_budget)
            .await
        {
            ActionOutcome::Succeeded(resolved) => {
                self.click(driver, "delete confirmation", resolved.element.id)
                    .await
            }
            ActionOutcome::Cancelled => Err(StepFailure::Cancelled),
            other => {
                self.log.record(&format!(
                    "No delete confirmation dialog ({})",
                    other.describe()
                ));
                Ok(())
            }
        }
    }

    /// Switch away from `name` first when it is active, then delete it.
    pub async fn delete_switching_away<D: Driver + ?Sized>(
        &mut self,
        driver: &mut D,
        session: &mut SessionContext,
        name: &str,
    ) -> Result<()> {
        if !session.is_deletable(name) {
            return Err(Error::NamingSafetyViolation(name.to_string()));
        }
        if self.dashboards.get(name).is_some_and(|r| r.is_active()) {
            let fallback = self
                .dashboards
                .iter()
                .find(|r| {
                    r.name != name
                        && !session.is_deletable(&r.name)
                        && matches!(r.state, DashboardState::Listed | DashboardState::Inactive)
                })
                .map(|r| r.name.clone())
                .ok_or_else(|| {
                    Error::InvariantViolation(format!(
                        "'{}' is active and there is no other non-test dashboard to switch to",
                        name
                    ))
                })?;
            info!("'{}' is active; switching to '{}' first", name, fallback);
            self.switch_active(driver, &fallback).await?;
        }
        self.delete(driver, session, name).await
    }

    /// Delete every stale test dashboard in the listing.
    pub async fn cleanup<D: Driver + ?Sized>(
        &mut self,
        driver: &mut D,
        session: &mut SessionContext,
        confirm_first: bool,
    ) -> Result<CleanupReport> {
        self.list(driver).await?;
        let targets: Vec<String> = self
            .dashboards
            .iter()
            .filter(|r| r.state.is_settled() && session.is_deletable(&r.name))
            .map(|r| r.name.clone())
            .collect();

        if targets.is_empty() {
            self.log.record("No stale test dashboards to clean up");
            return Ok(CleanupReport::default());
        }

        if confirm_first
            && !self
                .gate
                .confirm(&format!(
                    "Delete {} stale test dashboard(s): {}?",
                    targets.len(),
                    targets.join(", ")
                ))
                .await?
        {
            self.log.record("Cleanup declined");
            return Ok(CleanupReport {
                declined: true,
                ..CleanupReport::default()
            });
        }

        self.delete_all(driver, session, targets).await
    }

    /// Delete the dashboards this run created.
    pub async fn purge_created<D: Driver + ?Sized>(
        &mut self,
        driver: &mut D,
        session: &mut SessionContext,
    ) -> Result<CleanupReport> {
        self.list(driver).await?;
        let targets: Vec<String> = session
            .created_names()
            .iter()
            .filter(|n| session.is_deletable(n) && self.dashboards.contains(n))
            .cloned()
            .collect();
        self.delete_all(driver, session, targets).await
    }

    async fn delete_all<D: Driver + ?Sized>(
        &mut self,
        driver: &mut D,
        session: &mut SessionContext,
        targets: Vec<String>,
    ) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();
        for name in targets {
            report.attempted += 1;
            match self.delete_switching_away(driver, session, &name).await {
                Ok(()) => report.deleted.push(name),
                Err(e) if e.is_abort() => return Err(e),
                Err(e) if e.is_safety_violation() => {
                    // Rejected before any page interaction; nothing to continue past.
                    self.log.record(&format!("Refused to delete '{}': {}", name, e));
                    report.failed.push((name.clone(), e.to_string()));
                }
                Err(e) => {
                    warn!("Could not delete '{}': {}", name, e);
                    report.failed.push((name.clone(), e.to_string()));
                    let go_on = self
                        .gate
                        .confirm(&format!(
                            "Could not delete {}. Continue with the remaining cleanup?",
                            name
                        ))
                        .await?;
                    if !go_on {
                        return Err(Error::UserAbort(format!(
                            "cleanup stopped after failing to delete '{}'",
                            name
                        )));
                    }
                }
            }
        }
        self.log.record(&format!(
            "Cleanup finished: {} of {} deleted",
            report.deleted.len(),
            report.attempted
        ));
        Ok(report)
    }

    async fn open_row_menu<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        name: &str,
    ) -> std::result::Result<(), StepFailure> {
        let link = self
            .locate(driver, "dashboard link", &self.selectors.sidebar_links, self.timing.budget, exact_name(name))
            .await?;
        retry_driver!(self.retry, "hover dashboard link", driver.hover(link.id))
            .map_err(|e| StepFailure::from(("dashboard link", e)))?;

        let menu = self
            .locate(driver, "context menu", &self.selectors.context_menu, self.timing.budget, in_row(name))
            .await?;
        self.click(driver, "context menu", menu.id).await
    }

    async fn locate<D, F>(
        &self,
        driver: &mut D,
        step: &str,
        locators: &[Locator],
        budget: Duration,
        filter: F,
    ) -> std::result::Result<ElementInfo, StepFailure>
    where
        D: Driver + ?Sized,
        F: Fn(&ElementInfo) -> bool,
    {
        let list = candidates(step, locators);
        match self
            .resolver
            .resolve_matching(driver, &list, budget, filter)
            .await
        {
            ActionOutcome::Succeeded(resolved) => {
                if !resolved.tried.is_empty() {
                    self.log.record(&format!(
                        "Found {} via {} after {}",
                        step,
                        resolved.locator,
                        join_attempts(&resolved.tried)
                    ));
                }
                Ok(resolved.element)
            }
            ActionOutcome::Cancelled => Err(StepFailure::Cancelled),
            other => Err(StepFailure::Missing {
                step: step.to_string(),
                detail: other.describe(),
            }),
        }
    }

    async fn click<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        step: &str,
        element: ElementId,
    ) -> std::result::Result<(), StepFailure> {
        retry_driver!(self.retry, step, driver.click(element))
            .map_err(|e| StepFailure::from((step, e)))
    }

    /// Hand a failed transition to the operator. `Ok` means they confirmed it
    /// happened.
    async fn escalate(&mut self, failure: StepFailure, transition: &str, ask: &str) -> Result<()> {
        let (step, detail) = match failure {
            StepFailure::Cancelled => {
                return Err(Error::UserAbort(format!("cancelled during {}", transition)));
            }
            StepFailure::Missing { step, detail } => (step, detail),
        };
        self.log.record(&format!(
            "Could not {} automatically: {} ({})",
            transition, step, detail
        ));
        let prompt = format!("Could not {} automatically ({}: {}). {}", transition, step, detail, ask);
        if self.gate.confirm(&prompt).await? {
            self.log.record(&format!("Operator confirmed: {}", transition));
            Ok(())
        } else {
            Err(Error::SelectorExhausted {
                action: transition.to_string(),
                detail: format!("{}: {}", step, detail),
            })
        }
    }
}
