//! The configuration provider: initial load, refresh and snapshot access

use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::state::{EngineState, StateCell};
use crate::error::{SourceError, SourceResult};
use crate::logging::{LoggerExt, NoOpLogger, SharedLogger};
use crate::source::SourceOptions;
use crate::store::{KeyFilter, SharedStore};
use crate::trim::build_snapshot;
use crate::types::CancellationToken;
use crate::watch::{WatchRegistry, WatchedKey};
use crate::{log_debug, log_info};

/// Minimum time a failed initial load takes before it is surfaced or swallowed
pub const MIN_DELAY_FOR_UNHANDLED_FAILURE: Duration = Duration::from_secs(5);

type Snapshot = HashMap<String, String>;

/// What a call to `refresh` ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The initial load has not finished; nothing to refresh yet
    NotReady,
    /// Another refresh was in flight; its result stands for this caller too
    Skipped,
    /// No keys are watched
    NoWatchedKeys,
    Completed {
        /// Due watched keys checked during this pass, failed checks included
        checked: usize,
        /// Whether a sentinel change rebuilt the whole snapshot
        reloaded: bool,
    },
}

/// Database-backed configuration provider
///
/// Holds the snapshot exposed to the application and keeps it fresh through
/// watched keys. All dependencies are supplied at construction.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use dbconf_core::{CancellationToken, ConfigurationProvider, MemoryKeyValueStore, SourceOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> dbconf_core::SourceResult<()> {
/// let store = Arc::new(MemoryKeyValueStore::with_entries([("App:Name", "demo")]));
/// let options = SourceOptions::new().select("App:*")?.trim_key_prefix("App:")?;
///
/// let provider = ConfigurationProvider::with_store(options, store);
/// provider.load().await?;
/// assert_eq!(provider.get("Name"), Some("demo".to_string()));
///
/// assert!(provider.try_refresh(&CancellationToken::new()).await);
/// # Ok(())
/// # }
/// ```
pub struct ConfigurationProvider {
    store: SharedStore,
    logger: SharedLogger,
    filter: KeyFilter,
    trim_prefixes: BTreeSet<String>,
    watched_names: HashSet<String>,
    watches: Mutex<WatchRegistry>,
    optional: bool,
    data: ArcSwap<Snapshot>,
    state: StateCell,
}

impl ConfigurationProvider {
    pub fn new(options: SourceOptions, store: SharedStore, logger: SharedLogger) -> Self {
        let (filter, trim_prefixes, watches, optional) = options.into_parts();
        Self {
            store,
            logger,
            filter,
            trim_prefixes,
            watched_names: watches.key_set(),
            watches: Mutex::new(watches),
            optional,
            data: ArcSwap::from_pointee(HashMap::new()),
            state: StateCell::new(),
        }
    }

    /// Create a provider that does not log
    pub fn with_store(options: SourceOptions, store: SharedStore) -> Self {
        Self::new(options, store, NoOpLogger::shared())
    }

    pub fn state(&self) -> EngineState {
        self.state.load()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Current snapshot; never a partially rebuilt map
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.data.load_full()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.data.load().get(key).cloned()
    }

    /// Watched keys with their current expiry
    pub fn watched_keys(&self) -> Vec<WatchedKey> {
        self.watches.lock().keys().to_vec()
    }

    /// Perform the initial load
    ///
    /// A failure takes at least `MIN_DELAY_FOR_UNHANDLED_FAILURE`. It is then
    /// returned as `SourceError::InitialLoad` for a required source, or logged
    /// and swallowed (leaving the snapshot empty) for an optional one. Either
    /// way the provider leaves `NotReady` and accepts refreshes.
    pub async fn load(&self) -> SourceResult<()> {
        let started = Instant::now();

        let result = match self.load_inner().await {
            Ok(()) => {
                log_info!(
                    self.logger,
                    "Loaded {} configuration entries from {}",
                    self.data.load().len(),
                    self.store.name()
                );
                Ok(())
            }
            Err(err) => {
                let elapsed = started.elapsed();
                if elapsed < MIN_DELAY_FOR_UNHANDLED_FAILURE {
                    tokio::time::sleep(MIN_DELAY_FOR_UNHANDLED_FAILURE - elapsed).await;
                }

                if self.optional {
                    self.logger
                        .warn_with_error("Optional configuration source failed to load", &err);
                    Ok(())
                } else {
                    Err(SourceError::InitialLoad(Box::new(err)))
                }
            }
        };

        self.state.mark_ready();
        result
    }

    async fn load_inner(&self) -> SourceResult<()> {
        self.store.ensure_schema().await?;

        if let Some(data) = self.fetch_snapshot().await? {
            self.data.store(Arc::new(data));
        }

        self.watches.lock().mark_all_checked(Instant::now());
        Ok(())
    }

    /// Fetch and build a full snapshot; `None` when nothing is selected
    async fn fetch_snapshot(&self) -> SourceResult<Option<Snapshot>> {
        if self.filter.is_empty() {
            return Ok(None);
        }

        let rows = self.store.fetch_rows(&self.filter).await?;
        build_snapshot(rows, &self.watched_names, &self.trim_prefixes).map(Some)
    }

    /// Check due watched keys against the store
    ///
    /// Returns immediately without touching the store when the provider is
    /// not ready yet or another refresh holds the guard. Failures are logged
    /// at `warn` and returned; the guard is released in every case.
    pub async fn refresh(&self, token: &CancellationToken) -> SourceResult<RefreshOutcome> {
        let result = self.refresh_inner(token).await;
        match &result {
            Err(SourceError::Cancelled) => {
                log_debug!(self.logger, "Refresh cancelled by the caller");
            }
            Err(err) => self.logger.warn_with_error("A refresh operation failed", err),
            Ok(_) => {}
        }
        result
    }

    async fn refresh_inner(&self, token: &CancellationToken) -> SourceResult<RefreshOutcome> {
        let _guard = match self.state.try_acquire() {
            Ok(guard) => guard,
            Err(EngineState::NotReady) => {
                log_debug!(self.logger, "Refresh skipped: initial load has not completed");
                return Ok(RefreshOutcome::NotReady);
            }
            Err(_) => {
                log_debug!(self.logger, "Refresh skipped: a refresh is already in progress");
                return Ok(RefreshOutcome::Skipped);
            }
        };

        let watched = self.watches.lock().keys().to_vec();
        if watched.is_empty() {
            return Ok(RefreshOutcome::NoWatchedKeys);
        }

        let mut checked = 0;
        for watch in watched {
            if !watch.is_due(Instant::now()) {
                continue;
            }

            checked += 1;
            let reloaded = self.check_watch(&watch, token).await;
            // A failed check still waits out the interval before the next attempt
            self.watches.lock().mark_checked(&watch.key, Instant::now());

            if reloaded? {
                return Ok(RefreshOutcome::Completed {
                    checked,
                    reloaded: true,
                });
            }
        }

        Ok(RefreshOutcome::Completed {
            checked,
            reloaded: false,
        })
    }

    /// Fetch one watched key and apply it; `true` when everything was reloaded
    async fn check_watch(
        &self,
        watch: &WatchedKey,
        token: &CancellationToken,
    ) -> SourceResult<bool> {
        let current = cancellable(token, self.store.fetch_value(&watch.key)).await?;
        let cached = self.data.load().get(&watch.key).cloned();
        log_debug!(self.logger, "Checked watched key '{}'", watch.key);

        if cached == current {
            return Ok(false);
        }

        if !watch.refresh_all {
            self.patch(&watch.key, current);
            return Ok(false);
        }

        log_info!(
            self.logger,
            "Watched key '{}' changed, reloading all configuration",
            watch.key
        );
        if let Some(data) = cancellable(token, self.fetch_snapshot()).await? {
            self.data.store(Arc::new(data));
        }
        if !self.data.load().contains_key(&watch.key) {
            self.patch(&watch.key, current);
        }
        Ok(true)
    }

    /// Same as `refresh`, but reports failures as `false`
    pub async fn try_refresh(&self, token: &CancellationToken) -> bool {
        self.refresh(token).await.is_ok()
    }

    /// Publish a copy of the snapshot with one literal key changed
    ///
    /// A key whose row has disappeared is removed.
    fn patch(&self, key: &str, value: Option<String>) {
        self.data.rcu(|data| {
            let mut next = Snapshot::clone(data);
            match &value {
                Some(value) => {
                    next.insert(key.to_string(), value.clone());
                }
                None => {
                    next.remove(key);
                }
            }
            next
        });
    }
}

/// Race `future` against the caller's token
async fn cancellable<T, E, F>(token: &CancellationToken, future: F) -> SourceResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<SourceError>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SourceError::Cancelled),
        result = future => result.map_err(Into::into),
    }
}

impl std::fmt::Debug for ConfigurationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationProvider")
            .field("store", &self.store.name())
            .field("state", &self.state())
            .field("optional", &self.optional)
            .field("entries", &self.data.load().len())
            .finish()
    }
}
