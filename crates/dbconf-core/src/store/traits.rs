//! Core traits and types for backing stores

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::filter::KeyFilter;
use crate::types::ConfigEntry;

/// Errors that can occur during backing store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Invalid identifier '{0}': use letters, digits and '_' only")]
    InvalidIdentifier(String),

    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Other(String),
}

impl StoreError {
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Remote source of configuration rows
///
/// Implementations can be:
/// - In-memory for testing (`MemoryKeyValueStore`)
/// - A SQL table (`PostgresKeyValueStore`)
/// - Custom implementations (other databases, HTTP services, etc.)
///
/// Every value derived from configuration input must reach the backend as a
/// bound parameter, never as interpolated query text.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    /// Create whatever the store needs before the first load
    async fn ensure_schema(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Fetch every row selected by `filter`
    ///
    /// An empty filter selects nothing.
    async fn fetch_rows(&self, filter: &KeyFilter) -> StoreResult<Vec<ConfigEntry>>;

    /// Fetch the current value of a single key
    async fn fetch_value(&self, key: &str) -> StoreResult<Option<String>>;
}

/// Type alias for an Arc-wrapped store
pub type SharedStore = Arc<dyn KeyValueStore>;
