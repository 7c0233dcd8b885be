//! Error types for configuring, loading and refreshing a source

use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while building or running a configuration source
#[derive(Error, Debug)]
pub enum SourceError {
    /// Selector was empty, whitespace, or carried a `*` in the middle
    #[error("Invalid key selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// Trim prefix was empty or whitespace
    #[error("Invalid key prefix '{0}': prefix must not be empty")]
    InvalidPrefix(String),

    /// Watched key was empty or whitespace
    #[error("Invalid watched key '{0}': key must not be empty")]
    InvalidWatchKey(String),

    /// Cache expiration below the allowed floor
    #[error(
        "The cache expiration time cannot be less than {} milliseconds (requested {} milliseconds)",
        .minimum.as_millis(),
        .requested.as_millis()
    )]
    CacheExpirationOutOfRange { requested: Duration, minimum: Duration },

    /// The backing store failed
    #[error("Backing store error: {0}")]
    Backend(#[from] StoreError),

    /// The first load of a required source failed
    #[error("Initial configuration load failed: {0}")]
    InitialLoad(Box<SourceError>),

    /// Two rows produced the same exposed key
    #[error("Duplicate configuration key '{key}' produced by '{source_key}'")]
    DuplicateKey { key: String, source_key: String },

    /// The caller's cancellation token fired
    #[error("Operation cancelled")]
    Cancelled,

    /// A refresher set was built without any refreshers
    #[error("No configuration refreshers are registered")]
    NoRefreshers,

    /// Settings document could not be parsed
    #[error("Settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SourceError {
    /// Create an invalid selector error
    pub fn invalid_selector(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            reason: reason.into(),
        }
    }

    /// Create a duplicate key error
    pub fn duplicate_key(key: impl Into<String>, source_key: impl Into<String>) -> Self {
        Self::DuplicateKey {
            key: key.into(),
            source_key: source_key.into(),
        }
    }

    /// Registration-time errors; these are programmer errors and never swallowed
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidSelector { .. }
                | Self::InvalidPrefix(_)
                | Self::InvalidWatchKey(_)
                | Self::CacheExpirationOutOfRange { .. }
        )
    }
}

pub type SourceResult<T> = Result<T, SourceError>;
