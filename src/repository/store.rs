//! The repo store: listing and batch reconciliation, standalone or inside a
//! caller-managed transaction.

use std::error::Error;

use sqlx::Connection;
use tokio_util::sync::CancellationToken;

use crate::config::StoreConfig;
use crate::error::{DbResultExt, StoreError, StoreResult};
use crate::model::Repo;
use crate::util::guarded;

use super::codec::{encode_batch, repo_from_row};
use super::database::Database;
use super::paginate::{PageSource, Paginator};
use super::query::{insert_unmatched, project_batch, update_matching, ListReposQuery};
use super::tx::{DbHandle, TxState};

/// Reads and writes persistent repos
#[allow(async_fn_in_trait)]
pub trait RepoStore {
    /// Live repos of the configured kinds that have a source or are named
    /// in `names`, ascending by id.
    async fn list_repos(&self, cancel: &CancellationToken, names: &[&str]) -> StoreResult<Vec<Repo>>;

    /// Reconcile `repos` with the store and overwrite each with its persisted
    /// state, or change nothing on error.
    async fn upsert_repos(&self, cancel: &CancellationToken, repos: &mut [Repo]) -> StoreResult<()>;
}

/// Starts stores that operate within a transaction
#[allow(async_fn_in_trait)]
pub trait Transactor {
    type Tx: TxStore;

    async fn transact(&self, cancel: &CancellationToken) -> StoreResult<Self::Tx>;
}

/// A store bound to a transaction. Once done it can't be used further;
/// start a new one from the original [`Transactor`].
#[allow(async_fn_in_trait)]
pub trait TxStore: RepoStore {
    /// Commit when `err` is `None`, roll back otherwise
    async fn done(&self, err: Option<&dyn Error>);
}

/// [`RepoStore`] backed by the SQLite `repo` table
#[derive(Debug, Clone)]
pub struct DbStore {
    handle: DbHandle,
    config: StoreConfig,
}

impl DbStore {
    pub fn new(handle: impl Into<DbHandle>, config: StoreConfig) -> Self {
        Self {
            handle: handle.into(),
            config,
        }
    }

    pub fn from_database(db: &Database, config: StoreConfig) -> Self {
        Self::new(db.pool().clone(), config)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub async fn state(&self) -> TxState {
        self.handle.state().await
    }

    /// See [`RepoStore::list_repos`]. A failure discards every page read so far.
    pub async fn list_repos(
        &self,
        cancel: &CancellationToken,
        names: &[&str],
    ) -> StoreResult<Vec<Repo>> {
        const OP: &str = "list_repos";

        let query = ListReposQuery::new(&self.config.kinds, names);
        let paginator = Paginator::new(self.config.page_size);

        guarded(OP, cancel, self.config.statement_timeout(), async {
            let mut repos = Vec::new();
            let mut pages = RepoPages {
                handle: &self.handle,
                query: &query,
            };
            let rounds = paginator.collect_into(&mut pages, &mut repos).await?;
            tracing::debug!(rounds, listed = repos.len(), "listed repos");
            Ok(repos)
        })
        .await
    }

    /// See [`RepoStore::upsert_repos`].
    ///
    /// Matches stored rows by id, by case-insensitive name, or by a complete
    /// origin triple. Matched rows keep the larger id and their origin fields
    /// where the input has none; everything else is overwritten. Unmatched
    /// repos are inserted. All of it commits together.
    pub async fn upsert_repos(
        &self,
        cancel: &CancellationToken,
        repos: &mut [Repo],
    ) -> StoreResult<()> {
        const OP: &str = "upsert_repos";

        if repos.is_empty() {
            return Ok(());
        }

        let batch = encode_batch(repos)?;
        let expected = repos.len();

        let reconciled = guarded(OP, cancel, self.config.statement_timeout(), async {
            let mut conn = self.handle.acquire(OP).await?;
            // A savepoint when already inside a transaction
            let mut tx = conn.begin().await.op(OP)?;

            let updated = update_matching(&batch)
                .build()
                .execute(&mut *tx)
                .await
                .op(OP)?
                .rows_affected();
            let inserted = insert_unmatched(&batch)
                .build()
                .execute(&mut *tx)
                .await
                .op(OP)?
                .rows_affected();
            let rows = project_batch(&batch)
                .build()
                .fetch_all(&mut *tx)
                .await
                .op(OP)?;

            if rows.len() != expected {
                return Err(StoreError::decode(
                    OP,
                    "batch",
                    format!("projected {} rows for {expected} repos", rows.len()),
                ));
            }
            let reconciled = rows
                .iter()
                .map(|row| repo_from_row(OP, row))
                .collect::<StoreResult<Vec<_>>>()?;

            tx.commit().await.op(OP)?;

            tracing::debug!(batch = expected, updated, inserted, "reconciled repos");
            Ok(reconciled)
        })
        .await?;

        for (slot, repo) in repos.iter_mut().zip(reconciled) {
            *slot = repo;
        }

        Ok(())
    }

    /// A store whose operations run in one transaction. Already transacting
    /// stores return a handle on the same transaction; transactions don't nest.
    pub async fn transact(&self, cancel: &CancellationToken) -> StoreResult<DbStore> {
        match self.state().await {
            TxState::Transacting => return Ok(self.clone()),
            TxState::Terminated => return Err(StoreError::TxDone),
            TxState::Standalone => {}
        }

        let handle = guarded("transact", cancel, None, self.handle.begin(&self.config.tx)).await?;
        tracing::debug!(behavior = ?self.config.tx.behavior, "began transaction");

        Ok(Self {
            handle,
            config: self.config.clone(),
        })
    }

    /// Terminate the transaction: commit when `err` is `None`, roll back
    /// otherwise. A no-op outside a transaction or once done. The outcome of
    /// the commit or rollback itself is only logged.
    pub async fn done(&self, err: Option<&dyn Error>) {
        let commit = err.is_none();
        match self.handle.finish(commit).await {
            Some(Ok(())) => tracing::debug!(commit, "finished transaction"),
            Some(Err(e)) => tracing::warn!(error = %e, commit, "failed to finish transaction"),
            None => {}
        }
    }

    /// Call [`DbStore::done`] according to `result` and hand it back
    pub async fn finish<T, E: Error>(&self, result: Result<T, E>) -> Result<T, E> {
        self.done(result.as_ref().err().map(|e| e as &dyn Error)).await;
        result
    }
}

impl RepoStore for DbStore {
    async fn list_repos(&self, cancel: &CancellationToken, names: &[&str]) -> StoreResult<Vec<Repo>> {
        DbStore::list_repos(self, cancel, names).await
    }

    async fn upsert_repos(&self, cancel: &CancellationToken, repos: &mut [Repo]) -> StoreResult<()> {
        DbStore::upsert_repos(self, cancel, repos).await
    }
}

impl Transactor for DbStore {
    type Tx = DbStore;

    async fn transact(&self, cancel: &CancellationToken) -> StoreResult<DbStore> {
        DbStore::transact(self, cancel).await
    }
}

impl TxStore for DbStore {
    async fn done(&self, err: Option<&dyn Error>) {
        DbStore::done(self, err).await
    }
}

/// Pages of the list query, each on whatever connection the handle gives out
struct RepoPages<'a> {
    handle: &'a DbHandle,
    query: &'a ListReposQuery,
}

impl PageSource for RepoPages<'_> {
    type Item = Repo;

    async fn fetch_page(&mut self, cursor: i64, limit: i64) -> StoreResult<Vec<Repo>> {
        const OP: &str = "list_repos";

        let mut conn = self.handle.acquire(OP).await?;
        let mut qb = self.query.page(cursor, limit);
        let rows = qb.build().fetch_all(&mut *conn).await.op(OP)?;

        rows.iter().map(|row| repo_from_row(OP, row)).collect()
    }
}
