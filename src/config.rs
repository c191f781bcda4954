//! Configuration for the database and the store.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{StoreError, StoreResult};
use crate::repository::{DEFAULT_PAGE_SIZE, TxOptions};

/// Top-level configuration file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub store: StoreConfig,
}

impl Config {
    /// Load a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> StoreResult<()> {
        if self.store.page_size < 1 {
            return Err(StoreError::Config(format!(
                "store.page_size must be positive, got {}",
                self.store.page_size
            )));
        }
        if self.database.max_connections == 0 {
            return Err(StoreError::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// SQLite connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file, or `:memory:`
    #[serde(default = "default_path")]
    pub path: String,
    /// In-memory databases are always limited to one connection.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_path() -> String {
    "repos.db".to_string()
}

fn default_max_connections() -> u32 {
    4
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl DatabaseConfig {
    pub fn in_memory() -> Self {
        Self {
            path: ":memory:".to_string(),
            max_connections: 1,
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Store behaviour settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// External service kinds to list; empty lists every kind
    #[serde(default)]
    pub kinds: Vec<String>,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default)]
    pub tx: TxOptions,
    /// Deadline applied to each store operation
    #[serde(default)]
    pub statement_timeout_ms: Option<u64>,
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kinds: Vec::new(),
            page_size: default_page_size(),
            tx: TxOptions::default(),
            statement_timeout_ms: None,
        }
    }
}

impl StoreConfig {
    pub fn with_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout_ms.map(Duration::from_millis)
    }
}
