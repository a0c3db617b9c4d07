//! Retry policy for the external AI calls.
//!
//! At most one retry, transient failures only. Generation is billable
//! and non-deterministic, so anything beyond a single retry has to go
//! back to the caller as a failed job.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use adreel_ai_client::AiResult;

/// Delay before the single retry.
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Run `attempt` once; on a transient failure, run it exactly once more.
/// Permanent failures and second failures propagate unchanged.
pub async fn retry_transient<T, F, Fut>(op: &str, mut attempt: F) -> AiResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AiResult<T>>,
{
    match attempt().await {
        Ok(value) => Ok(value),
        Err(e) if e.is_transient() => {
            warn!("{op} failed transiently, retrying once: {e}");
            tokio::time::sleep(RETRY_DELAY).await;
            attempt().await
        }
        Err(e) => Err(e),
    }
}
