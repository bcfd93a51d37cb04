//! Per-run naming and ownership tracking.

use regex::Regex;
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_PREFIX: &str = "AUTO-TEST-";
pub const DEFAULT_SUFFIX: &str = "Widget-Test";

/// Identity of one automation run and the dashboards it created.
#[derive(Debug, Clone)]
pub struct SessionContext {
    session_id: String,
    name_prefix: String,
    name_suffix: String,
    legacy_patterns: Vec<Regex>,
    created: Vec<String>,
}

impl SessionContext {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::with_session_id(generate_session_id(), prefix, suffix)
    }

    pub fn with_session_id(
        session_id: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            name_prefix: prefix.into(),
            name_suffix: suffix.into(),
            legacy_patterns: Vec::new(),
            created: Vec::new(),
        }
    }

    /// Also treat names matching these patterns as test dashboards.
    /// Invalid patterns are skipped with a warning.
    pub fn with_legacy_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Self {
        for pattern in patterns {
            match Regex::new(pattern.as_ref()) {
                Ok(re) => self.legacy_patterns.push(re),
                Err(e) => tracing::warn!("Ignoring legacy pattern '{}': {}", pattern.as_ref(), e),
            }
        }
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    /// The dashboard name this run uses: prefix + session token + suffix.
    pub fn new_name(&self) -> String {
        format!("{}{}-{}", self.name_prefix, self.session_id, self.name_suffix)
    }

    /// Remember a dashboard created by this run. Order is creation order.
    pub fn record(&mut self, name: &str) {
        if !self.created.iter().any(|n| n == name) {
            self.created.push(name.to_string());
        }
    }

    /// Follow a rename of a dashboard created by this run.
    pub fn rename_created(&mut self, old: &str, new: &str) -> bool {
        match self.created.iter_mut().find(|n| n.as_str() == old) {
            Some(slot) => {
                *slot = new.to_string();
                true
            }
            None => false,
        }
    }

    pub fn forget(&mut self, name: &str) {
        self.created.retain(|n| n != name);
    }

    pub fn created_names(&self) -> &[String] {
        &self.created
    }

    pub fn is_created(&self, name: &str) -> bool {
        self.created.iter().any(|n| n == name)
    }

    /// Whether `name` carries this automation's prefix.
    pub fn is_owned(&self, name: &str) -> bool {
        !self.name_prefix.is_empty() && name.trim().starts_with(&self.name_prefix)
    }

    pub fn is_legacy_test_name(&self, name: &str) -> bool {
        let name = name.trim();
        self.legacy_patterns.iter().any(|re| re.is_match(name))
    }

    /// The only names automated deletion may ever target.
    pub fn is_deletable(&self, name: &str) -> bool {
        self.is_owned(name) || self.is_legacy_test_name(name)
    }
}

/// Six-digit token from the wall clock, unique enough across sequential runs.
fn generate_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{:06}", millis % 1_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionContext {
        SessionContext::with_session_id("123456", DEFAULT_PREFIX, DEFAULT_SUFFIX)
            .with_legacy_patterns(&[r"^Dashboard \d+$", "Zendesk Test"])
    }

    #[test]
    fn test_new_name_is_stable_per_run() {
        let s = session();
        assert_eq!(s.new_name(), "AUTO-TEST-123456-Widget-Test");
        assert_eq!(s.new_name(), s.new_name());
    }

    #[test]
    fn test_generated_id_is_six_digits() {
        let s = SessionContext::new(DEFAULT_PREFIX, DEFAULT_SUFFIX);
        assert_eq!(s.session_id().len(), 6);
        assert!(s.session_id().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_ownership() {
        let s = session();
        assert!(s.is_owned("AUTO-TEST-999999-Widget-Test"));
        assert!(!s.is_owned("Sales overview"));
        assert!(!s.is_owned("My AUTO-TEST- copy"));
        assert!(s.is_deletable("Dashboard 12"));
        assert!(s.is_deletable("Zendesk Test v1.3"));
        assert!(!s.is_deletable("Dashboard for execs"));
    }

    #[test]
    fn test_empty_prefix_owns_nothing() {
        let s = SessionContext::with_session_id("1", "", "x");
        assert!(!s.is_owned("anything"));
    }

    #[test]
    fn test_created_names_keep_order_and_follow_renames() {
        let mut s = session();
        s.record("Dashboard 3");
        s.record("Dashboard 4");
        s.record("Dashboard 3");
        assert_eq!(s.created_names(), &["Dashboard 3", "Dashboard 4"]);

        assert!(s.rename_created("Dashboard 3", "AUTO-TEST-123456-Widget-Test"));
        assert!(!s.rename_created("Missing", "x"));
        assert_eq!(
            s.created_names(),
            &["AUTO-TEST-123456-Widget-Test", "Dashboard 4"]
        );

        s.forget("Dashboard 4");
        assert!(!s.is_created("Dashboard 4"));
    }

    #[test]
    fn test_invalid_legacy_pattern_skipped() {
        let s = SessionContext::with_session_id("1", "P-", "s").with_legacy_patterns(&["(unclosed"]);
        assert!(!s.is_legacy_test_name("(unclosed"));
    }
}
