//! Core types shared across the store, trimmer and refresh engine

mod entry;
mod cancellation;

pub use entry::ConfigEntry;
pub use cancellation::CancellationToken;
