//! Registration surface for a configuration source
//!
//! Options can be assembled with the `SourceOptions` builder or read from a
//! YAML/JSON settings document. Both paths run the same validation.

mod options;
mod refresh_options;
mod settings;

pub use options::SourceOptions;
pub use refresh_options::RefreshOptions;
pub use settings::{RefreshSettings, SourceSettings, WatchSettings};
