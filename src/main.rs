mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command};
use repo_updater::util::{format_date, format_sources, truncate};
use repo_updater::{Config, Database, DbStore, Repo};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Could not load config: {}", path.display()))?,
        None => {
            let mut config = Config::default();
            config.database.path = default_db_path()?;
            config
        }
    };
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }
    if !cli.kinds.is_empty() {
        config.store.kinds = cli.kinds.clone();
    }

    tracing::info!(db = %config.database.path, "using repo store");

    let db = Database::connect(&config.database)
        .await
        .context("Failed to open database")?;
    db.init_schema().await.context("Failed to initialize schema")?;
    let store = DbStore::from_database(&db, config.store.clone());

    // Ctrl-C aborts in-flight queries
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    match cli.command {
        Command::Upsert { file } => upsert(&store, &cancel, &file).await,
        Command::List { names } => list(&store, &cancel, &names).await,
    }
}

fn default_db_path() -> Result<String> {
    let data_dir = dirs::data_dir()
        .context("Could not determine data directory")?
        .join("repo-updater");
    fs::create_dir_all(&data_dir)?;
    let path = data_dir.join("repos.db");
    Ok(path.to_str().context("Invalid path encoding")?.to_string())
}

async fn upsert(store: &DbStore, cancel: &CancellationToken, file: &std::path::Path) -> Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("Could not read {}", file.display()))?;
    let mut repos: Vec<Repo> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid repos JSON in {}", file.display()))?;

    let tx = store.transact(cancel).await?;
    let result = tx.upsert_repos(cancel, &mut repos).await;
    tx.finish(result).await.context("Upsert failed")?;

    tracing::info!(count = repos.len(), "upserted repos");
    println!("{}", serde_json::to_string_pretty(&repos)?);
    Ok(())
}

async fn list(store: &DbStore, cancel: &CancellationToken, names: &[String]) -> Result<()> {
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let repos = store.list_repos(cancel, &names).await.context("List failed")?;

    for repo in &repos {
        println!(
            "{:>8}  {:<48}  {:<10}  {:<24}  {}",
            repo.id,
            truncate(&repo.name, 48),
            repo.external_repo.service_type.as_deref().unwrap_or("-"),
            truncate(&format_sources(&repo.sources), 24),
            format_date(repo.updated_at.or(Some(repo.created_at))),
        );
    }
    eprintln!("{} repos", repos.len());
    Ok(())
}
