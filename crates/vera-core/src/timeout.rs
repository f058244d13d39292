//! Caller-supplied deadlines for backend calls.

use std::future::Future;
use std::time::Duration;

use crate::error::BackendError;

/// Run `fut` with a deadline, mapping expiry to [`BackendError::Timeout`].
///
/// A `None` deadline runs the future to completion. On expiry the future is
/// dropped at its current suspension point; callers that mutate state must
/// therefore commit in a single non-suspending step.
pub async fn with_timeout<T, E, F>(
    operation: impl Into<String>,
    deadline: Option<Duration>,
    fut: F,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<BackendError>,
{
    let Some(limit) = deadline else {
        return fut.await;
    };
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            let operation = operation.into();
            let millis = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(%operation, millis, "operation exceeded deadline");
            Err(BackendError::Timeout { operation, millis }.into())
        }
    }
}
