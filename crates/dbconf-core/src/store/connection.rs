//! Connection settings for SQL backing stores

use serde::{Deserialize, Serialize};

use super::traits::{StoreError, StoreResult};

fn default_schema() -> String {
    "public".to_string()
}

fn default_table() -> String {
    "configurations".to_string()
}

/// Where the configuration table lives
///
/// Schema and table names are spliced into statements as quoted identifiers,
/// so they are restricted to a safe alphabet. Everything else is bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Database connection URL
    pub url: String,

    #[serde(default = "default_schema")]
    pub schema: String,

    #[serde(default = "default_table")]
    pub table: String,
}

impl ConnectionSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            schema: default_schema(),
            table: default_table(),
        }
    }

    pub fn with_table(mut self, schema: impl Into<String>, table: impl Into<String>) -> Self {
        self.schema = schema.into();
        self.table = table.into();
        self
    }

    /// Check schema and table names
    pub fn validate(&self) -> StoreResult<()> {
        validate_identifier(&self.schema)?;
        validate_identifier(&self.table)
    }

    /// Quoted `"schema"."table"` name
    pub fn qualified_table(&self) -> String {
        format!("\"{}\".\"{}\"", self.schema, self.table)
    }

    /// Quoted `"schema"` name
    pub fn quoted_schema(&self) -> String {
        format!("\"{}\"", self.schema)
    }
}

fn validate_identifier(name: &str) -> StoreResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}
