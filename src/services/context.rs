//! I/O guard shared by the reconciliation jobs
//!
//! Every remote, cache or store call made by a job goes through
//! [`JobContext::io`], which bounds it by a per-call timeout and by the
//! process-wide cancellation token so that shutdown never waits on a stalled
//! upstream.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct JobContext {
    cancel: CancellationToken,
    io_timeout: Duration,
}

impl JobContext {
    pub fn new(cancel: CancellationToken, io_timeout: Duration) -> Self {
        Self { cancel, io_timeout }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run one I/O call, labelled `op` in the resulting error.
    pub async fn io<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AppError::Cancelled(op.to_string())),
            result = tokio::time::timeout(self.io_timeout, fut) => match result {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout(format!("{op} exceeded {:?}", self.io_timeout))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_io_passes_through() {
        let ctx = JobContext::new(CancellationToken::new(), Duration::from_secs(1));
        let value = ctx.io("add", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);

        let err = ctx
            .io::<(), _>("add", async { Err(AppError::Cache("down".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cache(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_io_times_out() {
        let ctx = JobContext::new(CancellationToken::new(), Duration::from_secs(5));
        let err = ctx
            .io("live_rooms", async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_io_cancelled() {
        let cancel = CancellationToken::new();
        let ctx = JobContext::new(cancel.clone(), Duration::from_secs(60));
        cancel.cancel();

        let err = ctx
            .io("members", std::future::pending::<Result<()>>())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
