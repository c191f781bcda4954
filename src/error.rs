//! Store error types.

use std::time::Duration;
use thiserror::Error;

/// Repository store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{op}: {source}")]
    Database {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to encode repo {repo:?}: {source}")]
    Serialization {
        repo: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("dbstore: not transactable")]
    NotTransactable,

    #[error("dbstore: transaction already finished")]
    TxDone,

    #[error("{op}: failed to decode {column}: {reason}")]
    Decode {
        op: &'static str,
        column: &'static str,
        reason: String,
    },

    #[error("{op}: cancelled")]
    Cancelled { op: &'static str },

    #[error("{op}: deadline exceeded after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// True when the call was aborted by its cancellation token or deadline
    /// rather than failing on its own.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::Timeout { .. })
    }

    pub(crate) fn decode(op: &'static str, column: &'static str, reason: impl ToString) -> Self {
        Self::Decode {
            op,
            column,
            reason: reason.to_string(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Attaches an operation name to sqlx failures.
pub(crate) trait DbResultExt<T> {
    fn op(self, op: &'static str) -> StoreResult<T>;
}

impl<T> DbResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn op(self, op: &'static str) -> StoreResult<T> {
        self.map_err(|source| StoreError::Database { op, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_carries_op() {
        let err: StoreResult<()> = Err(sqlx::Error::RowNotFound).op("list_repos");
        let msg = err.unwrap_err().to_string();
        assert!(msg.starts_with("list_repos: "), "got {msg}");
    }

    #[test]
    fn test_cancellation_is_distinguishable() {
        assert!(StoreError::Cancelled { op: "upsert_repos" }.is_cancellation());
        assert!(
            StoreError::Timeout {
                op: "list_repos",
                after: Duration::from_millis(10)
            }
            .is_cancellation()
        );
        assert!(!StoreError::NotTransactable.is_cancellation());
        assert!(!StoreError::decode("scan_repo", "sources", "bad").is_cancellation());
    }

    #[test]
    fn test_not_transactable_message() {
        assert_eq!(StoreError::NotTransactable.to_string(), "dbstore: not transactable");
    }
}
