//! PostgreSQL backing store built on `sqlx`

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};

use super::connection::ConnectionSettings;
use super::filter::KeyFilter;
use super::traits::{KeyValueStore, StoreError, StoreResult};
use crate::source::SourceOptions;
use crate::types::ConfigEntry;

/// Backing store that reads a `(key, value)` table in PostgreSQL
///
/// Keys, values and selector patterns are always bound as parameters.
/// Schema and table names are validated identifiers. Selectors match
/// case-insensitively; a watched key is fetched by its exact name.
#[derive(Clone)]
pub struct PostgresKeyValueStore {
    pool: PgPool,
    schema: String,
    table: String,
}

impl PostgresKeyValueStore {
    /// Open a connection pool for `settings`
    pub async fn connect(settings: &ConnectionSettings) -> StoreResult<Self> {
        settings.validate()?;
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&settings.url)
            .await?;

        Ok(Self {
            pool,
            schema: settings.quoted_schema(),
            table: settings.qualified_table(),
        })
    }

    /// Open a connection pool for the settings registered with `SourceOptions::connect`
    pub async fn from_options(options: &SourceOptions) -> StoreResult<Self> {
        let settings = connection_for(options)?;
        Self::connect(settings).await
    }

    /// Wrap an existing pool
    pub fn with_pool(pool: PgPool, settings: &ConnectionSettings) -> StoreResult<Self> {
        settings.validate()?;
        Ok(Self {
            pool,
            schema: settings.quoted_schema(),
            table: settings.qualified_table(),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl KeyValueStore for PostgresKeyValueStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn ensure_schema(&self) -> StoreResult<()> {
        let create_schema = format!("CREATE SCHEMA IF NOT EXISTS {}", self.schema);
        sqlx::query(&create_schema).execute(&self.pool).await?;

        let create_table = format!(
            "CREATE TABLE IF NOT EXISTS {} (\
                \"key\" text PRIMARY KEY, \
                \"value\" text NOT NULL, \
                label text NOT NULL DEFAULT '', \
                last_modified timestamptz DEFAULT now())",
            self.table
        );
        sqlx::query(&create_table).execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_rows(&self, filter: &KeyFilter) -> StoreResult<Vec<ConfigEntry>> {
        if filter.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT \"key\", \"value\" FROM {} WHERE ",
            self.table
        ));
        let mut clauses = builder.separated(" OR ");
        for rule in filter.rules() {
            match rule.like_pattern() {
                None => {
                    clauses.push("lower(\"key\") = lower(");
                    clauses.push_bind_unseparated(rule.value().to_string());
                    clauses.push_unseparated(")");
                }
                Some(pattern) => {
                    clauses.push("\"key\" ILIKE ");
                    clauses.push_bind_unseparated(pattern);
                    clauses.push_unseparated(" ESCAPE '\\'");
                }
            }
        }
        builder.push(" ORDER BY \"key\"");

        let rows: Vec<(String, String)> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ConfigEntry::from).collect())
    }

    async fn fetch_value(&self, key: &str) -> StoreResult<Option<String>> {
        let sql = format!("SELECT \"value\" FROM {} WHERE \"key\" = $1", self.table);
        let value = sqlx::query_scalar::<_, String>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }
}

fn connection_for(options: &SourceOptions) -> StoreResult<&ConnectionSettings> {
    let settings = options
        .connection()
        .ok_or_else(|| StoreError::connection("no connection settings configured"))?;
    settings.validate()?;
    Ok(settings)
}

impl std::fmt::Debug for PostgresKeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresKeyValueStore")
            .field("table", &self.table)
            .finish()
    }
}
