use std::time::Duration;

/// Bounded retry for individual driver actions (click, fill, navigate...).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Re-evaluate a driver call until it succeeds or the policy is exhausted.
///
/// `$call` is re-evaluated on every attempt, so it must be an expression
/// producing a fresh future (e.g. `driver.click(id)`).
macro_rules! retry_driver {
    ($policy:expr, $what:expr, $call:expr) => {{
        let policy: $crate::resolution::RetryPolicy = $policy;
        let mut attempt: u32 = 1;
        loop {
            match $call.await {
                Ok(value) => break Ok(value),
                Err(e) if attempt < policy.max_attempts => {
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}",
                        $what,
                        attempt,
                        policy.max_attempts,
                        e
                    );
                    attempt += 1;
                    tokio::time::sleep(policy.delay).await;
                }
                Err(e) => break Err(e),
            }
        }
    }};
}

pub(crate) use retry_driver;
