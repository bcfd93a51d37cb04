use crate::config::ConfigError;
use crate::confirm::ConfirmError;
use crate::driver::DriverError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No candidate resolved and the human did not confirm a manual fallback.
    #[error("Could not locate {action}: {detail}")]
    SelectorExhausted { action: String, detail: String },

    /// A lifecycle precondition was violated; rejected before touching the page.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Aborted by user: {0}")]
    UserAbort(String),

    /// The dashboard is not owned by this automation and may not be deleted.
    #[error("Refusing to touch '{0}': not an automation-owned dashboard")]
    NamingSafetyViolation(String),

    #[error("Unknown dashboard '{0}'")]
    UnknownDashboard(String),

    #[error("Missing credential: {0} must be set")]
    MissingCredential(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Safety-gate errors are never retried or confirmed past.
    pub fn is_safety_violation(&self) -> bool {
        matches!(
            self,
            Error::InvariantViolation(_) | Error::NamingSafetyViolation(_)
        )
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, Error::UserAbort(_))
    }
}

impl From<ConfirmError> for Error {
    fn from(e: ConfirmError) -> Self {
        Error::UserAbort(e.to_string())
    }
}
