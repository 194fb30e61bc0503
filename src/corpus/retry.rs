//! Timeout and single-retry wrapper for store calls

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::DatabaseConfig;
use crate::errors::JokeError;
use crate::errors::Result;

/// Bounds every store call by a timeout; reads get one retry after a backoff
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&DatabaseConfig::default())
    }
}

impl RetryPolicy {
    pub const fn new(timeout: Duration, backoff: Duration) -> Self {
        Self { timeout, backoff }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.query_timeout_ms),
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Run an idempotent read, retrying once on a transient failure
    ///
    /// A second transient failure surfaces as `DependencyUnavailable`.
    pub async fn read<T, F, Fut>(&self, op: &str, f: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.once(op, f()).await {
            Err(e) if e.is_retryable() => {
                warn!("Store {} failed ({}), retrying in {:?}", op, e, self.backoff);
                tokio::time::sleep(self.backoff).await;
                self.once(op, f()).await.map_err(|e| {
                    if e.is_retryable() {
                        JokeError::DependencyUnavailable(format!("{op}: {e}"))
                    } else {
                        e
                    }
                })
            }
            other => other,
        }
    }

    /// Run a write under the timeout only; writes are never replayed
    pub async fn write<T, Fut>(&self, op: &str, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        self.once(op, fut).await
    }

    async fn once<T, Fut>(&self, op: &str, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.timeout, fut).await.map_err(|_| {
            warn!("Store {} timed out after {:?}", op, self.timeout);
            JokeError::DependencyUnavailable(format!(
                "{op} timed out after {} ms",
                self.timeout.as_millis()
            ))
        })?
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(50), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_transient_read_retried_once() {
        let calls = AtomicUsize::new(0);
        let result = policy()
            .read("nearest", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(JokeError::DependencyUnavailable("blip".to_string()))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persistent_failure_gives_up_after_two_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = policy()
            .read("get", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(JokeError::Http("reset".to_string()))
            })
            .await;

        assert!(matches!(result, Err(JokeError::DependencyUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_errors_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = policy()
            .read("get", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(JokeError::NotFound(3))
            })
            .await;

        assert!(matches!(result, Err(JokeError::NotFound(3))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_write_times_out() {
        let result: Result<()> = policy()
            .write("record_feedback", async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(JokeError::DependencyUnavailable(_))));
    }
}
