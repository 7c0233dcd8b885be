//! Watch rules sharing one cache-expiration interval

use std::time::Duration;

use crate::error::SourceResult;
use crate::watch::{validate_interval, WatchRule, DEFAULT_CACHE_EXPIRATION_INTERVAL};

/// A batch of watched keys registered together
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use dbconf_core::source::RefreshOptions;
///
/// let refresh = RefreshOptions::new()
///     .register("App:Sentinel", true)
///     .register("App:Banner", false)
///     .set_cache_expiration(Duration::from_secs(10))
///     .unwrap();
/// assert_eq!(refresh.watchers().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOptions {
    watchers: Vec<WatchRule>,
    cache_expiration: Duration,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshOptions {
    pub fn new() -> Self {
        Self {
            watchers: Vec::new(),
            cache_expiration: DEFAULT_CACHE_EXPIRATION_INTERVAL,
        }
    }

    /// Watch `key`; with `refresh_all` a change reloads the whole snapshot
    pub fn register(mut self, key: impl Into<String>, refresh_all: bool) -> Self {
        self.watchers.push(WatchRule::new(key, refresh_all));
        self
    }

    /// Set the interval for every key in this batch
    pub fn set_cache_expiration(mut self, cache_expiration: Duration) -> SourceResult<Self> {
        validate_interval(cache_expiration)?;
        self.cache_expiration = cache_expiration;
        Ok(self)
    }

    pub fn watchers(&self) -> &[WatchRule] {
        &self.watchers
    }

    pub fn cache_expiration(&self) -> Duration {
        self.cache_expiration
    }

    pub(crate) fn into_parts(self) -> (Vec<WatchRule>, Duration) {
        (self.watchers, self.cache_expiration)
    }
}
