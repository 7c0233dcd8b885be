//! Watched keys and their staleness bookkeeping

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{SourceError, SourceResult};

/// Interval used when a refresh configuration does not set one
pub const DEFAULT_CACHE_EXPIRATION_INTERVAL: Duration = Duration::from_secs(30);

/// Shortest interval a watched key may be checked at
pub const MIN_CACHE_EXPIRATION_INTERVAL: Duration = Duration::from_secs(1);

/// A user-declared watch before it is registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRule {
    pub key: String,
    /// Reload the whole snapshot when this key changes
    pub refresh_all: bool,
}

impl WatchRule {
    pub fn new(key: impl Into<String>, refresh_all: bool) -> Self {
        Self {
            key: key.into(),
            refresh_all,
        }
    }
}

/// A key monitored for change
///
/// Identity is the key alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedKey {
    pub key: String,
    pub refresh_all: bool,
    /// The minimum time that must elapse between two checks of this key
    pub cache_expiration_interval: Duration,
    /// When the key next becomes eligible; `None` until first checked
    pub cache_expires: Option<Instant>,
}

impl WatchedKey {
    pub fn is_due(&self, now: Instant) -> bool {
        self.cache_expires.map_or(true, |expires| now >= expires)
    }

    pub fn mark_checked(&mut self, now: Instant) {
        self.cache_expires = Some(now + self.cache_expiration_interval);
    }
}

/// The set of watched keys, kept in registration order
#[derive(Debug, Clone, Default)]
pub struct WatchRegistry {
    keys: Vec<WatchedKey>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a batch of watches sharing one cache-expiration interval
    ///
    /// The whole batch is validated before anything is stored, so a rejected
    /// batch leaves the registry untouched. Registering a key that is
    /// already watched replaces its policy and interval in place.
    pub fn register<I>(&mut self, rules: I, interval: Duration) -> SourceResult<()>
    where
        I: IntoIterator<Item = WatchRule>,
    {
        validate_interval(interval)?;

        let rules = rules.into_iter().collect::<Vec<_>>();
        if let Some(rule) = rules.iter().find(|r| r.key.trim().is_empty()) {
            return Err(SourceError::InvalidWatchKey(rule.key.clone()));
        }

        for rule in rules {
            match self.keys.iter_mut().find(|w| w.key == rule.key) {
                Some(existing) => {
                    existing.refresh_all = rule.refresh_all;
                    existing.cache_expiration_interval = interval;
                }
                None => self.keys.push(WatchedKey {
                    key: rule.key,
                    refresh_all: rule.refresh_all,
                    cache_expiration_interval: interval,
                    cache_expires: None,
                }),
            }
        }

        Ok(())
    }

    /// Unknown keys are never due
    pub fn is_due(&self, key: &str, now: Instant) -> bool {
        self.get(key).is_some_and(|w| w.is_due(now))
    }

    /// Push the key's next check out by its interval
    pub fn mark_checked(&mut self, key: &str, now: Instant) {
        if let Some(watched) = self.keys.iter_mut().find(|w| w.key == key) {
            watched.mark_checked(now);
        }
    }

    pub fn mark_all_checked(&mut self, now: Instant) {
        for watched in &mut self.keys {
            watched.mark_checked(now);
        }
    }

    pub fn get(&self, key: &str) -> Option<&WatchedKey> {
        self.keys.iter().find(|w| w.key == key)
    }

    pub fn keys(&self) -> &[WatchedKey] {
        &self.keys
    }

    /// Literal names of all watched keys
    pub fn key_set(&self) -> HashSet<String> {
        self.keys.iter().map(|w| w.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Reject intervals below `MIN_CACHE_EXPIRATION_INTERVAL`
pub fn validate_interval(interval: Duration) -> SourceResult<()> {
    if interval < MIN_CACHE_EXPIRATION_INTERVAL {
        return Err(SourceError::CacheExpirationOutOfRange {
            requested: interval,
            minimum: MIN_CACHE_EXPIRATION_INTERVAL,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_keeps_order() {
        let mut registry = WatchRegistry::new();
        registry
            .register(
                [WatchRule::new("Sentinel", true), WatchRule::new("App:Color", false)],
                Duration::from_secs(10),
            )
            .unwrap();

        let keys: Vec<_> = registry.keys().iter().map(|w| w.key.as_str()).collect();
        assert_eq!(keys, vec!["Sentinel", "App:Color"]);
        assert_eq!(registry.get("Sentinel").unwrap().cache_expiration_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_duplicate_registration_replaces_policy() {
        let mut registry = WatchRegistry::new();
        registry
            .register([WatchRule::new("Sentinel", true)], Duration::from_secs(10))
            .unwrap();
        registry
            .register([WatchRule::new("Sentinel", false)], Duration::from_secs(60))
            .unwrap();

        assert_eq!(registry.len(), 1);
        let watched = registry.get("Sentinel").unwrap();
        assert!(!watched.refresh_all);
        assert_eq!(watched.cache_expiration_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_sub_second_interval_is_rejected_without_mutation() {
        let mut registry = WatchRegistry::new();
        registry
            .register([WatchRule::new("Existing", true)], Duration::from_secs(5))
            .unwrap();

        let result = registry.register([WatchRule::new("Sentinel", true)], Duration::from_millis(500));

        assert!(matches!(result, Err(SourceError::CacheExpirationOutOfRange { .. })));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("Sentinel").is_none());
    }

    #[test]
    fn test_empty_key_rejects_whole_batch() {
        let mut registry = WatchRegistry::new();
        let result = registry.register(
            [WatchRule::new("Sentinel", true), WatchRule::new("  ", false)],
            Duration::from_secs(5),
        );

        assert!(matches!(result, Err(SourceError::InvalidWatchKey(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_one_second_interval_is_allowed() {
        let mut registry = WatchRegistry::new();
        assert!(registry
            .register([WatchRule::new("Sentinel", true)], MIN_CACHE_EXPIRATION_INTERVAL)
            .is_ok());
    }

    #[test]
    fn test_due_and_mark_checked() {
        let mut registry = WatchRegistry::new();
        registry
            .register([WatchRule::new("Sentinel", true)], Duration::from_secs(10))
            .unwrap();
        let t0 = Instant::now();

        assert!(registry.is_due("Sentinel", t0));

        registry.mark_checked("Sentinel", t0);
        assert!(!registry.is_due("Sentinel", t0 + Duration::from_secs(9)));
        assert!(registry.is_due("Sentinel", t0 + Duration::from_secs(10)));
        assert!(!registry.is_due("Unknown", t0));
    }

    #[test]
    fn test_mark_all_checked() {
        let mut registry = WatchRegistry::new();
        registry
            .register(
                [WatchRule::new("A", true), WatchRule::new("B", false)],
                Duration::from_secs(10),
            )
            .unwrap();
        let t0 = Instant::now();

        registry.mark_all_checked(t0);

        assert!(!registry.is_due("A", t0));
        assert!(!registry.is_due("B", t0));
        assert_eq!(
            registry.key_set(),
            ["A", "B"].iter().map(|s| s.to_string()).collect::<HashSet<_>>()
        );
    }
}
