//! dbconf Core
//!
//! A configuration source that loads key-value rows from a database table
//! into an in-memory snapshot and keeps it fresh without restarts.
//!
//! ## Loading
//!
//! Selectors (`App:*`, `*:Timeout`, `Exact:Key`) decide which rows are
//! fetched. Trim prefixes shorten the exposed keys; watched keys are always
//! exposed under their literal name.
//!
//! ## Refreshing
//!
//! Watched keys are re-checked no more often than their cache-expiration
//! interval. A changed *sentinel* (`refresh_all`) rebuilds the whole
//! snapshot; other watched keys are patched individually. Only one refresh
//! runs at a time, and callers that arrive meanwhile return at once.
//!
//! ```rust,ignore
//! use dbconf_core::{
//!     ConfigurationProvider, ConnectionSettings, PostgresKeyValueStore, RefreshOptions, SourceOptions,
//! };
//!
//! let options = SourceOptions::new()
//!     .select("App:*")?
//!     .trim_key_prefix("App:")?
//!     .configure_refresh(RefreshOptions::new().register("App:Sentinel", true))?
//!     .connect(ConnectionSettings::new("postgres://localhost/app"));
//! let store = PostgresKeyValueStore::from_options(&options).await?;
//!
//! let provider = ConfigurationProvider::new(options, Arc::new(store), logger);
//! provider.load().await?;
//!
//! // On each inbound request
//! provider.try_refresh(&CancellationToken::new()).await;
//! ```

pub mod types;
pub mod error;
pub mod logging;
pub mod store;
pub mod trim;
pub mod watch;
pub mod source;
pub mod engine;
pub mod refresher;

// Re-export commonly used types
pub use types::{CancellationToken, ConfigEntry};

pub use error::{SourceError, SourceResult};

pub use logging::{ConsoleLogger, LogLevel, Logger, MemoryLogger, NoOpLogger, SharedLogger};

pub use store::{
    ConnectionSettings, KeyFilter, KeyValueStore, MemoryKeyValueStore, SelectionRule,
    SharedStore, StoreError, StoreResult,
};
#[cfg(feature = "postgres")]
pub use store::PostgresKeyValueStore;

pub use trim::build_snapshot;

pub use watch::{
    WatchRegistry, WatchRule, WatchedKey, DEFAULT_CACHE_EXPIRATION_INTERVAL,
    MIN_CACHE_EXPIRATION_INTERVAL,
};

pub use source::{RefreshOptions, SourceOptions, SourceSettings};

pub use engine::{ConfigurationProvider, EngineState, RefreshOutcome, MIN_DELAY_FOR_UNHANDLED_FAILURE};

pub use refresher::{ConfigurationRefresher, RefresherSet};
