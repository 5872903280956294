use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::warn;

use crate::types::SyncError;

/// Cancellation handle shared between a dispatched attempt chain and the
/// refresh that may supersede it.
#[derive(Clone, Default)]
pub struct CancelFlag {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Capped retry with a constant backoff between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Run `op` up to `max_attempts` times. Both the in-flight attempt and
    /// the backoff sleep race against `cancel`, so a superseded run stops
    /// immediately instead of burning attempts for a stream that no longer
    /// matters.
    pub async fn run<T, F, Fut>(&self, cancel: &CancelFlag, mut op: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                return Err(SyncError::Superseded);
            }

            let outcome = tokio::select! {
                result = op() => result,
                _ = cancel.cancelled() => return Err(SyncError::Superseded),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(error = %err, attempt, "attempt failed");
                    last_error = Some(err);
                }
            }

            if attempt < attempts {
                tokio::select! {
                    _ = tokio::time::sleep(self.backoff) => {}
                    _ = cancel.cancelled() => return Err(SyncError::Superseded),
                }
            }
        }

        Err(SyncError::RetriesExhausted {
            attempts,
            source: Box::new(
                last_error.unwrap_or_else(|| SyncError::Backend("no attempts made".to_string())),
            ),
        })
    }
}
