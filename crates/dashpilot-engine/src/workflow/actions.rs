//! Resolve-then-act helpers for the steps outside the dashboard lifecycle.

use crate::confirm::ConfirmationGate;
use crate::driver::{Driver, ElementId, ElementInfo};
use crate::error::{Error, Result};
use crate::resolution::{
    ActionOutcome, Locator, RetryPolicy, SelectorCandidates, SelectorResolver, join_attempts,
    retry_driver,
};
use crate::runlog::SharedLog;
use crate::selectors::candidates;
use std::time::Duration;

/// Result of one automated action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Done,
    /// Could not be done automatically; carries the diagnostic.
    Missing(String),
}

#[derive(Clone)]
pub struct StepActions {
    resolver: SelectorResolver,
    retry: RetryPolicy,
    budget: Duration,
    /// For elements that may legitimately be absent.
    short_budget: Duration,
    log: SharedLog,
}

impl StepActions {
    pub fn new(
        resolver: SelectorResolver,
        retry: RetryPolicy,
        budget: Duration,
        short_budget: Duration,
        log: SharedLog,
    ) -> Self {
        Self {
            resolver,
            retry,
            budget,
            short_budget,
            log,
        }
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    pub async fn click<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        label: &str,
        locators: &[Locator],
    ) -> Result<Attempt> {
        self.click_where(driver, label, locators, |_| true).await
    }

    /// Click the first resolvable entry of a prepared candidate list.
    pub async fn click_candidates<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        list: &SelectorCandidates,
    ) -> Result<Attempt> {
        let element = match self.resolve(driver, list, self.budget, |_| true).await? {
            Ok(id) => id,
            Err(missing) => return Ok(missing),
        };
        match retry_driver!(self.retry, &list.label, driver.click(element)) {
            Ok(()) => Ok(Attempt::Done),
            Err(e) => Ok(Attempt::Missing(format!("{}: {}", list.label, e))),
        }
    }

    /// Pick one of `choices` in a native `<select>`. The select is looked up
    /// with the short budget since many layouts use custom pickers instead.
    pub async fn select<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        list: &SelectorCandidates,
        choices: &[String],
    ) -> Result<Attempt> {
        let element = match self.resolve(driver, list, self.short_budget, |_| true).await? {
            Ok(id) => id,
            Err(missing) => return Ok(missing),
        };
        match retry_driver!(self.retry, &list.label, driver.select_option(element, choices)) {
            Ok(Some(option)) => {
                self.log.record(&format!("Selected '{}' in {}", option, list.label));
                Ok(Attempt::Done)
            }
            Ok(None) => Ok(Attempt::Missing(format!(
                "{}: no option matching {}",
                list.label,
                choices.join(" / ")
            ))),
            Err(e) => Ok(Attempt::Missing(format!("{}: {}", list.label, e))),
        }
    }

    /// Click the element accepted by `filter`.
    pub async fn click_where<D, F>(
        &self,
        driver: &mut D,
        label: &str,
        locators: &[Locator],
        filter: F,
    ) -> Result<Attempt>
    where
        D: Driver + ?Sized,
        F: Fn(&ElementInfo) -> bool,
    {
        let list = candidates(label, locators);
        let element = match self.resolve(driver, &list, self.budget, filter).await? {
            Ok(id) => id,
            Err(missing) => return Ok(missing),
        };
        match retry_driver!(self.retry, label, driver.click(element)) {
            Ok(()) => Ok(Attempt::Done),
            Err(e) => Ok(Attempt::Missing(format!("{}: {}", label, e))),
        }
    }

    pub async fn fill<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        label: &str,
        locators: &[Locator],
        text: &str,
    ) -> Result<Attempt> {
        let list = candidates(label, locators);
        let element = match self.resolve(driver, &list, self.budget, |_| true).await? {
            Ok(id) => id,
            Err(missing) => return Ok(missing),
        };
        match retry_driver!(self.retry, label, driver.fill(element, text)) {
            Ok(()) => Ok(Attempt::Done),
            Err(e) => Ok(Attempt::Missing(format!("{}: {}", label, e))),
        }
    }

    async fn resolve<D, F>(
        &self,
        driver: &mut D,
        list: &SelectorCandidates,
        budget: Duration,
        filter: F,
    ) -> Result<std::result::Result<ElementId, Attempt>>
    where
        D: Driver + ?Sized,
        F: Fn(&ElementInfo) -> bool,
    {
        let label = list.label.as_str();
        match self
            .resolver
            .resolve_matching(driver, list, budget, filter)
            .await
        {
            ActionOutcome::Succeeded(resolved) => {
                if !resolved.tried.is_empty() {
                    self.log.record(&format!(
                        "Found {} via {} after {}",
                        label,
                        resolved.locator,
                        join_attempts(&resolved.tried)
                    ));
                }
                Ok(Ok(resolved.element.id))
            }
            ActionOutcome::Cancelled => Err(Error::UserAbort(format!("cancelled while looking for {}", label))),
            other => Ok(Err(Attempt::Missing(format!("{}: {}", label, other.describe())))),
        }
    }
}

/// Ask the operator to finish `action` by hand. `Ok` once they confirm it is
/// done; a "no" ends the step.
pub async fn complete_manually(
    gate: &mut ConfirmationGate,
    log: &SharedLog,
    action: &str,
    attempt: Attempt,
) -> Result<()> {
    let detail = match attempt {
        Attempt::Done => return Ok(()),
        Attempt::Missing(detail) => detail,
    };
    log.record(&format!("Could not {} automatically ({})", action, detail));
    let prompt = format!(
        "Could not {} automatically ({}). Please do it in the browser. Is it done?",
        action, detail
    );
    if gate.confirm(&prompt).await? {
        log.record(&format!("Operator completed: {}", action));
        Ok(())
    } else {
        Err(Error::SelectorExhausted {
            action: action.to_string(),
            detail,
        })
    }
}
