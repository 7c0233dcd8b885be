//! Backing store abstractions and implementations
//!
//! This module provides:
//! - `KeyValueStore` trait for the remote rows a source is built from
//! - `KeyFilter`/`SelectionRule`, the fetch filter built from selectors
//! - Built-in implementations: `MemoryKeyValueStore` and, with the `postgres`
//!   feature, `PostgresKeyValueStore`

mod traits;
mod filter;
mod connection;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use traits::{KeyValueStore, SharedStore, StoreError, StoreResult};
pub use filter::{KeyFilter, SelectionRule};
pub use connection::ConnectionSettings;
pub use memory::MemoryKeyValueStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresKeyValueStore;
