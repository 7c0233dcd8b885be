//! Refresh engine
//!
//! `ConfigurationProvider` owns the snapshot and the watched keys. It loads
//! once at startup and then re-checks watched keys whenever `refresh` is
//! called. At most one refresh runs at a time; callers that arrive while one
//! is in flight return immediately with `RefreshOutcome::Skipped`.

mod state;
mod provider;

pub use state::EngineState;
pub use provider::{ConfigurationProvider, RefreshOutcome, MIN_DELAY_FOR_UNHANDLED_FAILURE};
