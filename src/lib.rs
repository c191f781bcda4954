//! Repository metadata store for external code-host discovery.
//!
//! [`DbStore`] reconciles batches of discovered [`Repo`]s against a SQLite
//! `repo` table and lists the live ones, either standalone or within a
//! transaction started with [`DbStore::transact`].

pub mod config;
pub mod error;
pub mod model;
pub mod repository;
pub mod util;

pub use config::{Config, DatabaseConfig, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use model::{ExternalRepo, Metadata, Repo};
pub use repository::{Database, DbStore, RepoStore, Transactor, TxStore};
