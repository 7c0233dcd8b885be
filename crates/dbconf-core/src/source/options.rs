//! Builder for a configuration source

use std::collections::BTreeSet;

use crate::error::{SourceError, SourceResult};
use crate::store::{ConnectionSettings, KeyFilter, SelectionRule};
use crate::watch::WatchRegistry;

use super::refresh_options::RefreshOptions;

/// Options describing what a source loads and how it stays fresh
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use dbconf_core::source::{RefreshOptions, SourceOptions};
///
/// # fn main() -> dbconf_core::SourceResult<()> {
/// let options = SourceOptions::new()
///     .select("App:*")?
///     .trim_key_prefix("App:")?
///     .configure_refresh(
///         RefreshOptions::new()
///             .register("App:Sentinel", true)
///             .set_cache_expiration(Duration::from_secs(10))?,
///     )?;
/// assert_eq!(options.watches().len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    selectors: BTreeSet<String>,
    trim_prefixes: BTreeSet<String>,
    watches: WatchRegistry,
    optional: bool,
    connection: Option<ConnectionSettings>,
}

impl SourceOptions {
    /// Options for a required source; a failed first load is fatal
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for an optional source; a failed first load leaves it empty
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Self::default()
        }
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Add a key selector (`Key`, `Prefix*`, `*Suffix` or `*Part*`)
    pub fn select(mut self, selector: impl Into<String>) -> SourceResult<Self> {
        let selector = selector.into();
        SelectionRule::parse(&selector)?;
        self.selectors.insert(selector);
        Ok(self)
    }

    /// Add a prefix trimmed from exposed keys
    pub fn trim_key_prefix(mut self, prefix: impl Into<String>) -> SourceResult<Self> {
        let prefix = prefix.into();
        if prefix.trim().is_empty() {
            return Err(SourceError::InvalidPrefix(prefix));
        }
        self.trim_prefixes.insert(prefix);
        Ok(self)
    }

    /// Register a batch of watched keys
    pub fn configure_refresh(mut self, refresh: RefreshOptions) -> SourceResult<Self> {
        let (rules, interval) = refresh.into_parts();
        self.watches.register(rules, interval)?;
        Ok(self)
    }

    pub fn connect(mut self, connection: ConnectionSettings) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn selectors(&self) -> &BTreeSet<String> {
        &self.selectors
    }

    pub fn trim_prefixes(&self) -> &BTreeSet<String> {
        &self.trim_prefixes
    }

    pub fn watches(&self) -> &WatchRegistry {
        &self.watches
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn connection(&self) -> Option<&ConnectionSettings> {
        self.connection.as_ref()
    }

    /// Fetch filter for the registered selectors
    pub fn key_filter(&self) -> KeyFilter {
        // Selectors were validated on insert
        KeyFilter::new(
            self.selectors
                .iter()
                .filter_map(|s| SelectionRule::parse(s).ok())
                .collect(),
        )
    }

    pub(crate) fn into_parts(self) -> (KeyFilter, BTreeSet<String>, WatchRegistry, bool) {
        let filter = self.key_filter();
        (filter, self.trim_prefixes, self.watches, self.optional)
    }
}
