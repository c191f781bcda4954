//! Connection handles and transaction lifecycle.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

use crate::error::{DbResultExt, StoreError, StoreResult};

/// How a transaction takes SQLite's locks when it begins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxBehavior {
    #[default]
    Deferred,
    Immediate,
    Exclusive,
}

/// Options applied when [`DbHandle::begin`] starts a transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxOptions {
    pub behavior: TxBehavior,
}

impl TxOptions {
    fn begin_statement(&self) -> &'static str {
        match self.behavior {
            TxBehavior::Deferred => "BEGIN DEFERRED",
            TxBehavior::Immediate => "BEGIN IMMEDIATE",
            TxBehavior::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// Lifecycle of a store's handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Pool or dedicated connection; every call commits on its own
    Standalone,
    /// Bound to an open transaction shared by every clone
    Transacting,
    /// The shared transaction was committed or rolled back
    Terminated,
}

/// A transaction shared between clones of a transacting store.
/// `None` once finished.
pub(crate) type SharedTx = Arc<Mutex<Option<Transaction<'static, Sqlite>>>>;

/// What a store executes against
#[derive(Clone)]
pub enum DbHandle {
    /// Pooled connections; can begin transactions
    Pool(SqlitePool),
    /// A single connection whose transaction lifecycle belongs to the caller
    Connection(Arc<Mutex<SqliteConnection>>),
    /// An open transaction
    Tx(SharedTx),
}

impl std::fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            DbHandle::Pool(_) => "Pool",
            DbHandle::Connection(_) => "Connection",
            DbHandle::Tx(_) => "Tx",
        };
        f.debug_tuple("DbHandle").field(&kind).finish()
    }
}

impl From<SqlitePool> for DbHandle {
    fn from(pool: SqlitePool) -> Self {
        DbHandle::Pool(pool)
    }
}

impl From<SqliteConnection> for DbHandle {
    fn from(conn: SqliteConnection) -> Self {
        DbHandle::Connection(Arc::new(Mutex::new(conn)))
    }
}

impl DbHandle {
    pub(crate) async fn state(&self) -> TxState {
        match self {
            DbHandle::Pool(_) | DbHandle::Connection(_) => TxState::Standalone,
            DbHandle::Tx(tx) => {
                if tx.lock().await.is_some() {
                    TxState::Transacting
                } else {
                    TxState::Terminated
                }
            }
        }
    }

    /// Begin a new transaction. Only pools can.
    pub(crate) async fn begin(&self, opts: &TxOptions) -> StoreResult<DbHandle> {
        match self {
            DbHandle::Pool(pool) => {
                let tx = pool.begin_with(opts.begin_statement()).await.op("dbstore: BeginTx")?;
                Ok(DbHandle::Tx(Arc::new(Mutex::new(Some(tx)))))
            }
            DbHandle::Connection(_) => Err(StoreError::NotTransactable),
            DbHandle::Tx(_) => Err(StoreError::TxDone),
        }
    }

    /// Check out a connection for one operation
    pub(crate) async fn acquire(&self, op: &'static str) -> StoreResult<Conn<'_>> {
        match self {
            DbHandle::Pool(pool) => Ok(Conn::Pooled(pool.acquire().await.op(op)?)),
            DbHandle::Connection(conn) => Ok(Conn::Dedicated(conn.lock().await)),
            DbHandle::Tx(tx) => MutexGuard::try_map(tx.lock().await, Option::as_mut)
                .map(Conn::Tx)
                .map_err(|_| StoreError::TxDone),
        }
    }

    /// Commit or roll back the shared transaction, once. Returns `None` when
    /// there was nothing to finish.
    pub(crate) async fn finish(&self, commit: bool) -> Option<Result<(), sqlx::Error>> {
        let DbHandle::Tx(shared) = self else {
            return None;
        };
        let tx = shared.lock().await.take()?;
        Some(if commit { tx.commit().await } else { tx.rollback().await })
    }
}

/// A connection checked out for the duration of one operation
pub(crate) enum Conn<'a> {
    Pooled(PoolConnection<Sqlite>),
    Dedicated(MutexGuard<'a, SqliteConnection>),
    Tx(MappedMutexGuard<'a, Transaction<'static, Sqlite>>),
}

impl Deref for Conn<'_> {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        match self {
            Conn::Pooled(conn) => conn,
            Conn::Dedicated(conn) => conn,
            Conn::Tx(tx) => tx,
        }
    }
}

impl DerefMut for Conn<'_> {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        match self {
            Conn::Pooled(conn) => conn,
            Conn::Dedicated(conn) => conn,
            Conn::Tx(tx) => tx,
        }
    }
}
