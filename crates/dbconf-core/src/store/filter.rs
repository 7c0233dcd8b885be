//! Fetch filters built from key selectors
//!
//! A selector is a key with optional `*` markers at either end:
//!
//! | Selector   | Rule         |
//! |------------|--------------|
//! | `App:Name` | `Exact`      |
//! | `App:*`    | `StartsWith` |
//! | `*:Name`   | `EndsWith`   |
//! | `*Feat*`   | `Contains`   |
//!
//! Selectors are combined with OR and, like prefix trimming, ignore case.

use std::fmt;

use crate::error::{SourceError, SourceResult};

const WILDCARD: char = '*';

/// A single parsed selector
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SelectionRule {
    Exact(String),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
}

impl SelectionRule {
    /// Parse a selector, rejecting empty ones and inner wildcards
    pub fn parse(selector: &str) -> SourceResult<Self> {
        if selector.trim().is_empty() {
            return Err(SourceError::invalid_selector(selector, "selector must not be empty"));
        }

        let leading = selector.starts_with(WILDCARD);
        let trailing = selector.len() > 1 && selector.ends_with(WILDCARD);

        let start = usize::from(leading);
        let end = selector.len() - usize::from(trailing);
        let body = if start <= end { &selector[start..end] } else { "" };

        if body.contains(WILDCARD) {
            return Err(SourceError::invalid_selector(
                selector,
                "'*' is only supported at the start or end of a selector",
            ));
        }

        let body = body.to_string();
        Ok(match (leading, trailing) {
            (true, true) => Self::Contains(body),
            // A lone "*" selects everything
            (true, false) if body.is_empty() => Self::Contains(body),
            (true, false) => Self::EndsWith(body),
            (false, true) => Self::StartsWith(body),
            (false, false) => Self::Exact(body),
        })
    }

    /// The literal text of the rule without markers
    pub fn value(&self) -> &str {
        match self {
            Self::Exact(v) | Self::StartsWith(v) | Self::EndsWith(v) | Self::Contains(v) => v,
        }
    }

    /// Check whether a key is selected by this rule, ignoring case
    pub fn matches(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        let value = self.value().to_lowercase();
        match self {
            Self::Exact(_) => key == value,
            Self::StartsWith(_) => key.starts_with(&value),
            Self::EndsWith(_) => key.ends_with(&value),
            Self::Contains(_) => key.contains(&value),
        }
    }

    /// SQL `ILIKE` pattern for wildcard rules, escaped with `\`
    ///
    /// `Exact` rules return `None`; they compare lowercased values with `=`.
    pub fn like_pattern(&self) -> Option<String> {
        match self {
            Self::Exact(_) => None,
            Self::StartsWith(v) => Some(format!("{}%", escape_like(v))),
            Self::EndsWith(v) => Some(format!("%{}", escape_like(v))),
            Self::Contains(v) => Some(format!("%{}%", escape_like(v))),
        }
    }
}

impl fmt::Display for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "{}", v),
            Self::StartsWith(v) => write!(f, "{}*", v),
            Self::EndsWith(v) => write!(f, "*{}", v),
            Self::Contains(v) => write!(f, "*{}*", v),
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// OR-combination of selection rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFilter {
    rules: Vec<SelectionRule>,
}

impl KeyFilter {
    pub fn new(rules: Vec<SelectionRule>) -> Self {
        Self { rules }
    }

    /// Parse a list of selectors into a filter
    pub fn from_selectors<I, S>(selectors: I) -> SourceResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = selectors
            .into_iter()
            .map(|s| SelectionRule::parse(s.as_ref()))
            .collect::<SourceResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[SelectionRule] {
        &self.rules
    }

    /// An empty filter selects nothing
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn matches(&self, key: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(key))
    }
}
