// Shared test fixtures for integration tests
// Functions here are used across different test files
#![allow(dead_code)]

use repo_updater::config::StoreConfig;
use repo_updater::repository::{Database, DbStore};
use repo_updater::{ExternalRepo, Repo};
use std::path::PathBuf;
use tempfile::TempDir;
use time::macros::datetime;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

pub const CREATED_AT: OffsetDateTime = datetime!(2018-08-01 10:00 UTC);

/// Create an in-memory test database with initialized schema
pub async fn create_test_db() -> Database {
    let db = Database::new(":memory:").await.unwrap();
    db.init_schema().await.unwrap();
    db
}

/// Create a file-backed test database, for tests that need more than one connection
pub async fn create_file_db() -> (TempDir, PathBuf, Database) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("repos.db");
    let db = Database::new(path.to_str().unwrap()).await.unwrap();
    db.init_schema().await.unwrap();
    (dir, path, db)
}

pub async fn setup_store() -> (Database, DbStore) {
    setup_store_with(StoreConfig::default()).await
}

pub async fn setup_store_with(config: StoreConfig) -> (Database, DbStore) {
    let db = create_test_db().await;
    let store = DbStore::from_database(&db, config);
    (db, store)
}

pub fn ctx() -> CancellationToken {
    CancellationToken::new()
}

/// A transient repo with no origin and no sources
pub fn repo(name: &str) -> Repo {
    Repo::new(name, CREATED_AT)
}

/// A transient repo discovered on github.com through the "github" source
pub fn github_repo(name: &str, external_id: &str) -> Repo {
    Repo::new(name, CREATED_AT)
        .with_external(ExternalRepo::new("GITHUB", "https://github.com/", external_id))
        .with_sources(["github"])
}

/// Upsert `repos` standalone and return them as stored
pub async fn upsert(store: &DbStore, mut repos: Vec<Repo>) -> Vec<Repo> {
    store.upsert_repos(&ctx(), &mut repos).await.unwrap();
    repos
}

/// Live repos with sources, plus the named ones
pub async fn list(store: &DbStore, names: &[&str]) -> Vec<Repo> {
    store.list_repos(&ctx(), names).await.unwrap()
}

pub fn names(repos: &[Repo]) -> Vec<&str> {
    repos.iter().map(|r| r.name.as_str()).collect()
}
