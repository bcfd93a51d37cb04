//! Ordered-candidate element resolution.
//!
//! A logical action ("the New dashboard button") is described by several
//! locators because the target application reshuffles its markup between
//! releases. The resolver tries them strictly in order, giving each a slice of
//! the total budget (a hung query only costs its own slice), and reports the outcome as a value so callers can decide
//! whether to escalate to a human or give up.
//!
//! When a candidate matches several elements the following rule applies:
//! caller predicate first, then visible and enabled elements only, then, if
//! more than one is left, the single element inside an active container. Any
//! other multi-match is ambiguous and counts as a miss for that candidate.

use super::outcome::{ActionOutcome, AttemptFailure, CandidateAttempt, Resolved};
use super::{Locator, SelectorCandidates};
use crate::driver::{Driver, ElementInfo};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Result of a disambiguation pass over one query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pick {
    One(ElementInfo),
    None,
    Ambiguous(usize),
}

pub fn disambiguate<F>(locator: &Locator, elements: Vec<ElementInfo>, filter: &F) -> Pick
where
    F: Fn(&ElementInfo) -> bool,
{
    let mut usable: Vec<ElementInfo> = elements
        .into_iter()
        .filter(|e| locator.matches_text(&e.text) && filter(e) && e.is_interactable())
        .collect();

    match usable.len() {
        0 => Pick::None,
        1 => Pick::One(usable.remove(0)),
        n => {
            let mut active: Vec<ElementInfo> = usable.into_iter().filter(|e| e.active).collect();
            if active.len() == 1 {
                Pick::One(active.remove(0))
            } else {
                Pick::Ambiguous(n)
            }
        }
    }
}

/// Outcome of listing every element behind a set of candidates.
#[derive(Debug, Clone)]
pub enum ListOutcome {
    Found {
        locator: Locator,
        elements: Vec<ElementInfo>,
    },
    Empty(Vec<CandidateAttempt>),
    TimedOut(Locator),
    Cancelled,
}

enum Polled<T> {
    Hit(Locator, T, Vec<CandidateAttempt>),
    Exhausted(Vec<CandidateAttempt>),
    TimedOut(Locator),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct SelectorResolver {
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl SelectorResolver {
    pub fn new(poll_interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            cancel,
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn resolve<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        candidates: &SelectorCandidates,
        budget: Duration,
    ) -> ActionOutcome {
        self.resolve_matching(driver, candidates, budget, |_| true)
            .await
    }

    /// Resolve, only considering elements accepted by `filter`.
    pub async fn resolve_matching<D, F>(
        &self,
        driver: &mut D,
        candidates: &SelectorCandidates,
        budget: Duration,
        filter: F,
    ) -> ActionOutcome
    where
        D: Driver + ?Sized,
        F: Fn(&ElementInfo) -> bool,
    {
        let polled = self
            .poll(driver, candidates, budget, |locator, elements| {
                match disambiguate(locator, elements, &filter) {
                    Pick::One(element) => Ok(element),
                    Pick::None => Err(AttemptFailure::NoMatch),
                    Pick::Ambiguous(n) => Err(AttemptFailure::Ambiguous(n)),
                }
            })
            .await;

        match polled {
            Polled::Hit(locator, element, tried) => {
                debug!(
                    "Resolved '{}' via {} after {} failed candidate(s)",
                    candidates.label,
                    locator,
                    tried.len()
                );
                ActionOutcome::Succeeded(Resolved {
                    element,
                    locator,
                    tried,
                })
            }
            Polled::Exhausted(tried) => ActionOutcome::NotFound(tried),
            Polled::TimedOut(locator) => ActionOutcome::TimedOut(locator),
            Polled::Cancelled => ActionOutcome::Cancelled,
        }
    }

    /// Every visible element behind the first candidate that matches anything.
    pub async fn collect<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        candidates: &SelectorCandidates,
        budget: Duration,
    ) -> ListOutcome {
        let polled = self
            .poll(driver, candidates, budget, |locator, elements| {
                let visible: Vec<ElementInfo> = elements
                    .into_iter()
                    .filter(|e| e.visible && locator.matches_text(&e.text))
                    .collect();
                if visible.is_empty() {
                    Err(AttemptFailure::NoMatch)
                } else {
                    Ok(visible)
                }
            })
            .await;

        match polled {
            Polled::Hit(locator, elements, _) => ListOutcome::Found { locator, elements },
            Polled::Exhausted(tried) => ListOutcome::Empty(tried),
            Polled::TimedOut(locator) => ListOutcome::TimedOut(locator),
            Polled::Cancelled => ListOutcome::Cancelled,
        }
    }

    async fn poll<D, T, A>(
        &self,
        driver: &mut D,
        candidates: &SelectorCandidates,
        budget: Duration,
        mut accept: A,
    ) -> Polled<T>
    where
        D: Driver + ?Sized,
        A: FnMut(&Locator, Vec<ElementInfo>) -> Result<T, AttemptFailure>,
    {
        let mut tried = Vec::new();
        if candidates.is_empty() {
            return Polled::Exhausted(tried);
        }

        let started = Instant::now();
        let deadline = started + budget;
        let window = budget / candidates.len() as u32;

        for (index, locator) in candidates.iter().enumerate() {
            // Time a candidate leaves unused rolls over to the next one, and a
            // late candidate still gets a full window of its own.
            let slot_end = if index + 1 == candidates.len() {
                deadline
            } else {
                started + window * (index as u32 + 1)
            };
            let window_end = (Instant::now() + window).max(slot_end);
            let mut failure = AttemptFailure::NoMatch;

            loop {
                if self.cancel.is_cancelled() {
                    return Polled::Cancelled;
                }

                let query_budget = window_end.saturating_duration_since(Instant::now());
                let queried = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Polled::Cancelled,
                    r = tokio::time::timeout(query_budget, driver.query_all(locator)) => r,
                };

                match queried {
                    Err(_) => {
                        debug!("Query for {} did not return within {:?}", locator, query_budget);
                        if Instant::now() >= deadline {
                            return Polled::TimedOut(locator.clone());
                        }
                        failure = AttemptFailure::TimedOut;
                        break;
                    }
                    Ok(Err(e)) => {
                        failure = AttemptFailure::Driver(e.to_string());
                        break;
                    }
                    Ok(Ok(elements)) => match accept(locator, elements) {
                        Ok(hit) => return Polled::Hit(locator.clone(), hit, tried),
                        Err(f) => failure = f,
                    },
                }

                let now = Instant::now();
                if now >= window_end {
                    break;
                }
                let nap = self.poll_interval.min(window_end - now);
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Polled::Cancelled,
                    _ = tokio::time::sleep(nap) => {}
                }
            }

            debug!("Candidate {} for '{}' failed: {:?}", locator, candidates.label, failure);
            tried.push(CandidateAttempt {
                locator: locator.clone(),
                failure,
            });
        }

        Polled::Exhausted(tried)
    }
}
