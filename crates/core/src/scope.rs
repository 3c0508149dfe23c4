//! Request-scoped cancellation.
//!
//! Every storage call made on behalf of a request runs under a [`RequestScope`].
//! The scope carries a cancellation signal and an optional deadline; whichever
//! fires first aborts the in-flight future by dropping it, so an open database
//! transaction is rolled back rather than half-applied.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// The caller aborted (explicitly or by deadline) before the operation finished.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Sender side of a scope's cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Cancellation signal plus optional deadline for one unit of work.
///
/// Cheap to clone; clones observe the same signal.
#[derive(Debug, Clone)]
pub struct RequestScope {
    signal: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

impl RequestScope {
    /// Create a scope together with the handle that cancels it.
    pub fn new() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (
            CancelHandle { tx: Arc::new(tx) },
            Self {
                signal: rx,
                deadline: None,
            },
        )
    }

    /// A scope nobody can cancel (deadline may still be added).
    pub fn detached() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self {
            signal: rx,
            deadline: None,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        *self.signal.borrow() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the scope is cancelled or its deadline passes.
    pub async fn cancelled(&self) {
        let mut signal = self.signal.clone();
        let flagged = async move {
            loop {
                if *signal.borrow_and_update() {
                    return;
                }
                if signal.changed().await.is_err() {
                    // Sender gone without cancelling: never fires.
                    std::future::pending::<()>().await;
                }
            }
        };

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = flagged => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => flagged.await,
        }
    }

    /// Drive `fut` to completion unless the scope is cancelled first.
    ///
    /// A scope that is already cancelled never polls `fut`.
    pub async fn run<F, T, E>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<Cancelled>,
    {
        if self.is_cancelled() {
            return Err(Cancelled.into());
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => {
                tracing::debug!("request scope cancelled; dropping in-flight operation");
                Err(Cancelled.into())
            }
            res = fut => res,
        }
    }
}

impl Default for RequestScope {
    fn default() -> Self {
        Self::detached()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Cancelled,
    }

    impl From<Cancelled> for TestError {
        fn from(_: Cancelled) -> Self {
            TestError::Cancelled
        }
    }

    #[tokio::test]
    async fn detached_scope_runs_to_completion() {
        let scope = RequestScope::detached();
        let out: Result<u32, TestError> = scope.run(async { Ok(7) }).await;
        assert_eq!(out, Ok(7));
        assert!(!scope.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_scope_never_polls_the_future() {
        let (handle, scope) = RequestScope::new();
        handle.cancel();

        let mut polled = false;
        let out: Result<(), TestError> = scope
            .run(async {
                polled = true;
                Ok(())
            })
            .await;

        assert_eq!(out, Err(TestError::Cancelled));
        assert!(!polled);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_mid_flight_aborts() {
        let (handle, scope) = RequestScope::new();

        let work = scope.run(async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, TestError>("done")
        });
        let canceller = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            handle.cancel();
        };

        let (out, ()) = tokio::join!(work, canceller);
        assert_eq!(out, Err(TestError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_counts_as_cancellation() {
        let scope = RequestScope::detached().with_timeout(Duration::from_millis(50));

        let out = scope
            .run(async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, TestError>(())
            })
            .await;

        assert_eq!(out, Err(TestError::Cancelled));
    }

    #[test]
    fn earlier_deadline_wins() {
        let now = Instant::now();
        let scope = RequestScope::detached()
            .with_deadline(now + Duration::from_secs(10))
            .with_deadline(now + Duration::from_secs(1));
        assert_eq!(scope.deadline(), Some(now + Duration::from_secs(1)));
    }
}
