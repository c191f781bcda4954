// Shared benchmark helpers
#![allow(dead_code)]

use repo_updater::config::StoreConfig;
use repo_updater::repository::{Database, DbStore};
use repo_updater::{ExternalRepo, Metadata, Repo};
use serde_json::json;
use time::macros::datetime;

/// Generate `count` GitHub repos with realistic metadata
pub fn generate_repos(count: usize) -> Vec<Repo> {
    (0..count)
        .map(|i| {
            let mut repo = Repo::new(
                format!("github.com/org-{}/repo-{i}", i / 100),
                datetime!(2018-08-01 10:00 UTC),
            )
            .with_external(ExternalRepo::new(
                "GITHUB",
                "https://github.com/",
                format!("MDEwOlJlcG9zaXRvcnk{i}"),
            ))
            .with_sources(["extsvc:github:1"]);
            repo.description = format!("Repository number {i}");
            repo.language = "Rust".to_string();
            repo.metadata = Metadata::Value(json!({
                "id": i,
                "stargazers": i % 1000,
                "topics": ["bench", "repo"],
            }));
            repo
        })
        .collect()
}

/// In-memory store with schema
pub async fn setup_bench_store() -> DbStore {
    let db = Database::new(":memory:").await.unwrap();
    db.init_schema().await.unwrap();
    DbStore::from_database(&db, StoreConfig::default())
}
