use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One way of finding an element on the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Locator {
    /// Plain CSS selector.
    Css(String),
    /// CSS selector narrowed to elements whose rendered text contains `text`.
    CssWithText { css: String, text: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid locator '{input}': {reason}")]
pub struct LocatorParseError {
    pub input: String,
    pub reason: String,
}

impl Locator {
    pub fn css(css: impl Into<String>) -> Self {
        Locator::Css(css.into())
    }

    pub fn with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Locator::CssWithText {
            css: css.into(),
            text: text.into(),
        }
    }

    /// The CSS part of the locator.
    pub fn css_part(&self) -> &str {
        match self {
            Locator::Css(css) => css,
            Locator::CssWithText { css, .. } => css,
        }
    }

    /// The text filter, if any.
    pub fn text_filter(&self) -> Option<&str> {
        match self {
            Locator::Css(_) => None,
            Locator::CssWithText { text, .. } => Some(text),
        }
    }

    /// Whether `rendered` satisfies the text filter (case-insensitive
    /// substring, like Playwright's `:has-text`).
    pub fn matches_text(&self, rendered: &str) -> bool {
        match self.text_filter() {
            Some(text) => rendered.trim().to_lowercase().contains(&text.to_lowercase()),
            None => true,
        }
    }

    /// Whether the locator contains the `{name}` placeholder.
    pub fn mentions(&self, name: &str) -> bool {
        let placeholder = format!("{{{}}}", name);
        self.css_part().contains(&placeholder)
            || self.text_filter().is_some_and(|t| t.contains(&placeholder))
    }

    /// Replace every `{name}` placeholder with `value`.
    pub fn substitute(&self, name: &str, value: &str) -> Locator {
        let placeholder = format!("{{{}}}", name);
        match self {
            Locator::Css(css) => Locator::Css(css.replace(&placeholder, value)),
            Locator::CssWithText { css, text } => Locator::CssWithText {
                css: css.replace(&placeholder, value),
                text: text.replace(&placeholder, value),
            },
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(css) => write!(f, "{}", css),
            Locator::CssWithText { css, text } => write!(f, "{}:has-text(\"{}\")", css, text),
        }
    }
}

impl FromStr for Locator {
    type Err = LocatorParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let err = |reason: &str| LocatorParseError {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(err("empty selector"));
        }

        if let Some(text) = trimmed.strip_prefix("text=") {
            let text = unquote(text.trim());
            if text.is_empty() {
                return Err(err("empty text"));
            }
            return Ok(Locator::with_text("*", text));
        }

        for pseudo in [":has-text(", ":contains("] {
            if let Some(pos) = trimmed.rfind(pseudo) {
                let inner = trimmed[pos + pseudo.len()..]
                    .strip_suffix(')')
                    .ok_or_else(|| err("unterminated text filter"))?;
                let text = unquote(inner.trim());
                if text.is_empty() {
                    return Err(err("empty text"));
                }
                let css = trimmed[..pos].trim();
                let css = if css.is_empty() { "*" } else { css };
                return Ok(Locator::with_text(css, text));
            }
        }

        Ok(Locator::Css(trimmed.to_string()))
    }
}

fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}

impl TryFrom<String> for Locator {
    type Error = LocatorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Locator> for String {
    fn from(locator: Locator) -> Self {
        locator.to_string()
    }
}

/// Ordered alternatives for one logical UI element, most likely first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorCandidates {
    pub label: String,
    pub locators: Vec<Locator>,
}

impl SelectorCandidates {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            locators: Vec::new(),
        }
    }

    /// Build from selector strings, skipping (and logging) unparsable ones.
    pub fn parse(label: impl Into<String>, selectors: &[&str]) -> Self {
        let mut candidates = Self::new(label);
        for selector in selectors {
            match selector.parse() {
                Ok(locator) => candidates.locators.push(locator),
                Err(e) => tracing::warn!("Ignoring selector for '{}': {}", candidates.label, e),
            }
        }
        candidates
    }

    pub fn with(mut self, locator: Locator) -> Self {
        self.locators.push(locator);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Locator> {
        self.locators.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_css() {
        let loc: Locator = "button.openContextMenuButton---_8f4e".parse().unwrap();
        assert_eq!(loc, Locator::css("button.openContextMenuButton---_8f4e"));
    }

    #[test]
    fn test_parse_has_text_and_contains() {
        let a: Locator = r#"button:has-text("New dashboard")"#.parse().unwrap();
        let b: Locator = "button:contains('New dashboard')".parse().unwrap();
        assert_eq!(a, Locator::with_text("button", "New dashboard"));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), r#"button:has-text("New dashboard")"#);
    }

    #[test]
    fn test_parse_text_shorthand() {
        let loc: Locator = "text=Rename".parse().unwrap();
        assert_eq!(loc, Locator::with_text("*", "Rename"));

        let bare: Locator = r#":has-text("Today")"#.parse().unwrap();
        assert_eq!(bare.css_part(), "*");
    }

    #[test]
    fn test_parse_rejects_broken_filters() {
        assert!("".parse::<Locator>().is_err());
        assert!(r#"span:has-text("Delete""#.parse::<Locator>().is_err());
        assert!(r#"span:has-text("")"#.parse::<Locator>().is_err());
    }

    #[test]
    fn test_attribute_selectors_stay_css() {
        let loc: Locator = r#"a[data-service-name="zendesk3"]"#.parse().unwrap();
        assert_eq!(loc.text_filter(), None);
        assert!(loc.matches_text("anything"));
    }

    #[test]
    fn test_text_filter_ignores_case() {
        let loc = Locator::with_text("option", "today");
        assert!(loc.matches_text("  Today "));
        assert!(!loc.matches_text("Yesterday"));
    }

    #[test]
    fn test_placeholders() {
        let loc: Locator = r#"span.title---_3e44:has-text("{metric}")"#.parse().unwrap();
        assert!(loc.mentions("metric"));
        assert!(!loc.mentions("period"));
        assert_eq!(
            loc.substitute("metric", "Satisfaction score"),
            Locator::with_text("span.title---_3e44", "Satisfaction score")
        );

        let attr: Locator = r#"a[data-service-name="{service}"]"#.parse().unwrap();
        assert!(attr.mentions("service"));
        assert_eq!(
            attr.substitute("service", "zendesk3").to_string(),
            r#"a[data-service-name="zendesk3"]"#
        );
    }

    #[test]
    fn test_candidates_skip_invalid() {
        let c = SelectorCandidates::parse("rename", &["text=Rename", "", "[data-testid*=\"rename\"]"]);
        assert_eq!(c.len(), 2);
        assert_eq!(c.label, "rename");
    }
}
