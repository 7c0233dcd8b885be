//! In-memory backing store

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::filter::KeyFilter;
use super::traits::{KeyValueStore, StoreError, StoreResult};
use crate::types::ConfigEntry;

/// In-memory backing store for testing and embedded use
///
/// Rows are kept sorted by key. Fetches are counted, can be delayed, and can
/// be made to fail, which is what the refresh engine's tests lean on.
///
/// # Example
///
/// ```
/// use dbconf_core::store::MemoryKeyValueStore;
///
/// let store = MemoryKeyValueStore::new();
/// store.set("App:Name", "demo");
/// assert_eq!(store.get("App:Name"), Some("demo".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    rows: RwLock<BTreeMap<String, String>>,
    delay: RwLock<Option<Duration>>,
    failing: AtomicBool,
    fail_next: AtomicUsize,
    schema_ensured: AtomicBool,
    row_fetches: AtomicUsize,
    value_fetches: AtomicUsize,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with initial rows
    pub fn with_entries<I, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<ConfigEntry>,
    {
        let store = Self::new();
        {
            let mut rows = store.rows.write();
            for entry in entries {
                let entry = entry.into();
                rows.insert(entry.key, entry.value);
            }
        }
        store
    }

    /// Insert or update a row
    pub fn set(&self, key: &str, value: &str) {
        self.rows.write().insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        self.rows.write().remove(key);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.rows.read().get(key).cloned()
    }

    /// Make every fetch fail until turned off again
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make the next `count` fetches fail
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Delay every fetch by `delay`
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write() = delay;
    }

    /// Number of `fetch_rows` calls observed
    pub fn row_fetches(&self) -> usize {
        self.row_fetches.load(Ordering::SeqCst)
    }

    /// Number of `fetch_value` calls observed
    pub fn value_fetches(&self) -> usize {
        self.value_fetches.load(Ordering::SeqCst)
    }

    /// Total backend I/O observed
    pub fn total_fetches(&self) -> usize {
        self.row_fetches() + self.value_fetches()
    }

    pub fn schema_ensured(&self) -> bool {
        self.schema_ensured.load(Ordering::SeqCst)
    }

    async fn simulate_io(&self) -> StoreResult<()> {
        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::connection("memory store is unavailable"));
        }

        let consumed = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if consumed {
            return Err(StoreError::query("injected failure"));
        }

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn ensure_schema(&self) -> StoreResult<()> {
        self.schema_ensured.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_rows(&self, filter: &KeyFilter) -> StoreResult<Vec<ConfigEntry>> {
        self.row_fetches.fetch_add(1, Ordering::SeqCst);
        self.simulate_io().await?;

        let rows = self.rows.read();
        Ok(rows
            .iter()
            .filter(|(key, _)| filter.matches(key))
            .map(|(key, value)| ConfigEntry::new(key.as_str(), value.as_str()))
            .collect())
    }

    async fn fetch_value(&self, key: &str) -> StoreResult<Option<String>> {
        self.value_fetches.fetch_add(1, Ordering::SeqCst);
        self.simulate_io().await?;

        Ok(self.rows.read().get(key).cloned())
    }
}
