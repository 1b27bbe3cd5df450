//! Per-call time bound for record store interactions.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::ServiceError;
use crate::store::StoreError;

/// Await one store call, giving up after `limit`.
///
/// Store errors are folded into [`ServiceError`]; running out of time yields
/// `ServiceError::Timeout` naming `operation`.
pub async fn bounded<T, F>(operation: &'static str, limit: Duration, call: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(ServiceError::from),
        Err(_) => {
            warn!(operation, timeout_ms = limit.as_millis() as u64, "record store call timed out");
            Err(ServiceError::Timeout {
                operation,
                after: limit,
            })
        }
    }
}
