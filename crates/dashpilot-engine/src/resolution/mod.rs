pub mod locator;
pub mod outcome;
pub mod resolver;
pub mod retry;

pub use locator::{Locator, LocatorParseError, SelectorCandidates};
pub use outcome::{ActionOutcome, AttemptFailure, CandidateAttempt, Resolved, join_attempts};
pub use resolver::{DEFAULT_POLL_INTERVAL, ListOutcome, Pick, SelectorResolver, disambiguate};
pub use retry::RetryPolicy;
pub(crate) use retry::retry_driver;
