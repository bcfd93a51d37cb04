use super::Locator;
use crate::driver::ElementInfo;
use std::fmt;

/// Why a single candidate did not produce an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Nothing matched (or nothing interactable) before the window closed.
    NoMatch,
    /// Several elements survived disambiguation.
    Ambiguous(usize),
    /// The driver rejected the query.
    Driver(String),
    /// A query did not return before the candidate's window closed.
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateAttempt {
    pub locator: Locator,
    pub failure: AttemptFailure,
}

impl fmt::Display for CandidateAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.failure {
            AttemptFailure::NoMatch => write!(f, "{} (no match)", self.locator),
            AttemptFailure::Ambiguous(n) => write!(f, "{} ({} matches)", self.locator, n),
            AttemptFailure::Driver(e) => write!(f, "{} (error: {})", self.locator, e),
            AttemptFailure::TimedOut => write!(f, "{} (timed out)", self.locator),
        }
    }
}

/// The element a resolution settled on.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub element: ElementInfo,
    pub locator: Locator,
    /// Candidates tried before `locator`, in order.
    pub tried: Vec<CandidateAttempt>,
}

/// Result of resolving one logical action. Produced once per attempt.
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    Succeeded(Resolved),
    NotFound(Vec<CandidateAttempt>),
    /// The driver did not answer a query for this locator before the total
    /// budget ran out.
    TimedOut(Locator),
    Cancelled,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Succeeded(_))
    }

    pub fn element(&self) -> Option<&ElementInfo> {
        match self {
            ActionOutcome::Succeeded(resolved) => Some(&resolved.element),
            _ => None,
        }
    }

    /// One-line diagnostic naming every candidate tried.
    pub fn describe(&self) -> String {
        match self {
            ActionOutcome::Succeeded(r) => format!("resolved via {}", r.locator),
            ActionOutcome::NotFound(tried) => format!("tried {}", join_attempts(tried)),
            ActionOutcome::TimedOut(locator) => format!("timed out on {}", locator),
            ActionOutcome::Cancelled => "cancelled".to_string(),
        }
    }
}

pub fn join_attempts(tried: &[CandidateAttempt]) -> String {
    if tried.is_empty() {
        return "nothing".to_string();
    }
    tried
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
