use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{StoreError, StoreResult};

/// Run `fut` until it completes, `cancel` fires, or `deadline` elapses.
/// Dropping `fut` on cancellation aborts its in-flight I/O.
pub(crate) async fn guarded<T, F>(
    op: &'static str,
    cancel: &CancellationToken,
    deadline: Option<Duration>,
    fut: F,
) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    if cancel.is_cancelled() {
        return Err(StoreError::Cancelled { op });
    }

    let bounded = async {
        match deadline {
            Some(after) => tokio::time::timeout(after, fut)
                .await
                .unwrap_or(Err(StoreError::Timeout { op, after })),
            None => fut.await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StoreError::Cancelled { op }),
        res = bounded => res,
    }
}
