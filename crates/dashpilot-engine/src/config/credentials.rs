use crate::error::{Error, Result};
use std::fmt;

pub const EMAIL_VAR: &str = "GECKOBOARD_EMAIL";
pub const PASSWORD_VAR: &str = "GECKOBOARD_PASSWORD";

/// Login credentials. Never serialized; the password is redacted in debug
/// output.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(Error::MissingCredential(key))
        };
        Ok(Self {
            email: read(EMAIL_VAR)?,
            password: read(PASSWORD_VAR)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_password_is_named() {
        let err = Credentials::from_lookup(|k| (k == EMAIL_VAR).then(|| "qa@example.com".into()))
            .unwrap_err();
        assert!(matches!(err, Error::MissingCredential(PASSWORD_VAR)));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials {
            email: "qa@example.com".into(),
            password: "hunter2".into(),
        };
        let shown = format!("{:?}", creds);
        assert!(shown.contains("qa@example.com"));
        assert!(!shown.contains("hunter2"));
    }
}
