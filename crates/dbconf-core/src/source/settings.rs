//! Settings documents (YAML or JSON) describing a source
//!
//! ```yaml
//! optional: false
//! select: ["App:*", "Shared:Timeout"]
//! trim_key_prefixes: ["App:"]
//! connection:
//!   url: postgres://localhost/app
//!   table: configurations
//! refresh:
//!   cache_expiration_ms: 10000
//!   watch:
//!     - key: App:Sentinel
//!     - key: App:Banner
//!       refresh_all: false
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SourceError, SourceResult};
use crate::store::ConnectionSettings;

use super::options::SourceOptions;
use super::refresh_options::RefreshOptions;

fn default_refresh_all() -> bool {
    true
}

/// Settings document structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Swallow a failed first load instead of failing startup
    #[serde(default)]
    pub optional: bool,

    #[serde(default)]
    pub select: Vec<String>,

    #[serde(default)]
    pub trim_key_prefixes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<RefreshSettings>,
}

/// Watch batch in a settings document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshSettings {
    /// Defaults to 30 seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_expiration_ms: Option<u64>,

    #[serde(default)]
    pub watch: Vec<WatchSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchSettings {
    pub key: String,

    #[serde(default = "default_refresh_all")]
    pub refresh_all: bool,
}

impl SourceSettings {
    pub fn from_yaml_str(content: &str) -> SourceResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| SourceError::Settings(format!("Failed to parse YAML: {}", e)))
    }

    pub fn from_json_str(content: &str) -> SourceResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a settings file; `.json` files are read as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    pub fn to_yaml(&self) -> SourceResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| SourceError::Settings(format!("Failed to serialize YAML: {}", e)))
    }

    /// Validate and convert into builder options
    pub fn into_options(self) -> SourceResult<SourceOptions> {
        let mut options = SourceOptions::new().with_optional(self.optional);

        for selector in self.select {
            options = options.select(selector)?;
        }
        for prefix in self.trim_key_prefixes {
            options = options.trim_key_prefix(prefix)?;
        }
        if let Some(connection) = self.connection {
            options = options.connect(connection);
        }
        if let Some(refresh) = self.refresh {
            let mut batch = RefreshOptions::new();
            if let Some(ms) = refresh.cache_expiration_ms {
                batch = batch.set_cache_expiration(Duration::from_millis(ms))?;
            }
            for watch in refresh.watch {
                batch = batch.register(watch.key, watch.refresh_all);
            }
            options = options.configure_refresh(batch)?;
        }

        Ok(options)
    }
}
