use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Row, Sqlite};
use std::str::FromStr;

use crate::config::DatabaseConfig;
use crate::error::{DbResultExt, StoreResult};

use super::SCHEMA_VERSION;

/// SQLite database holding the `repo` table
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open (creating if needed) the database at `db_path`
    pub async fn new(db_path: &str) -> StoreResult<Self> {
        let config = if db_path == ":memory:" {
            DatabaseConfig::in_memory()
        } else {
            DatabaseConfig {
                path: db_path.to_string(),
                ..DatabaseConfig::default()
            }
        };
        Self::connect(&config).await
    }

    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        // PRAGMAs are applied to every pooled connection
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", config.path))
            .op("connect")?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout())
            .pragma("temp_store", "MEMORY");

        // Each connection to :memory: is its own database
        let max_connections = if config.is_in_memory() { 1 } else { config.max_connections };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .op("connect")?;

        tracing::debug!(path = %config.path, max_connections, "opened database");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Initialize database schema, returns true if schema was rebuilt
    pub async fn init_schema(&self) -> StoreResult<bool> {
        const OP: &str = "init_schema";

        // Version table first, it decides whether to rebuild
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )"
        ).execute(&self.pool).await.op(OP)?;

        let stored_version = self.schema_version().await?;
        let needs_rebuild = stored_version.as_deref() != Some(SCHEMA_VERSION);

        if needs_rebuild {
            if let Some(old) = &stored_version {
                tracing::info!(from = %old, to = SCHEMA_VERSION, "schema version changed, rebuilding");
            }
            sqlx::query("DROP TABLE IF EXISTS repo").execute(&self.pool).await.op(OP)?;
            sqlx::query("DELETE FROM schema_meta").execute(&self.pool).await.op(OP)?;
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS repo (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                description TEXT NOT NULL DEFAULT '',
                language TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL,
                updated_at INTEGER,
                deleted_at INTEGER,
                external_service_type TEXT,
                external_service_id TEXT,
                external_id TEXT,
                enabled INTEGER NOT NULL DEFAULT 1,
                archived INTEGER NOT NULL DEFAULT 0,
                fork INTEGER NOT NULL DEFAULT 0,
                sources TEXT NOT NULL DEFAULT '{}',
                metadata TEXT NOT NULL DEFAULT 'null'
            )"
        ).execute(&self.pool).await.op(OP)?;

        // NULLs are distinct, so partial triples never collide
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS repo_external_unique_idx
                ON repo (external_service_type, external_service_id, external_id)"
        ).execute(&self.pool).await.op(OP)?;

        if needs_rebuild {
            sqlx::query("INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('schema_version', ?)")
                .bind(SCHEMA_VERSION)
                .execute(&self.pool)
                .await
                .op(OP)?;
            tracing::info!(version = SCHEMA_VERSION, "initialized schema");
        }

        Ok(needs_rebuild)
    }

    /// Stored schema version, if the schema was ever initialized
    pub async fn schema_version(&self) -> StoreResult<Option<String>> {
        let version = sqlx::query("SELECT value FROM schema_meta WHERE key = 'schema_version'")
            .fetch_optional(&self.pool)
            .await
            .op("schema_version")?
            .map(|row| row.get("value"));
        Ok(version)
    }
}
