//! Key-value rows as returned by a backing store

use serde::{Deserialize, Serialize};

/// A single key-value row fetched from a backing store
///
/// Entries only live long enough to be folded into a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
}

impl ConfigEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for ConfigEntry {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}
