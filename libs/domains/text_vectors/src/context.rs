//! Per-call cancellation and deadline handling.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{VectorError, VectorResult};

/// Request-scoped context threaded through every operation.
///
/// Each call into the embedding generator or the vector store is raced
/// against the cancellation token and, if set, the deadline.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<(Instant, Duration)>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Sets a deadline `timeout` from now covering all upstream calls of this context.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some((Instant::now() + timeout, timeout));
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs one upstream call under this context.
    pub async fn run<T, F>(&self, operation: &'static str, call: F) -> VectorResult<T>
    where
        F: Future<Output = VectorResult<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(VectorError::Cancelled(operation));
        }

        let guarded = async {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(VectorError::Cancelled(operation)),
                result = call => result,
            }
        };

        match self.deadline {
            Some((deadline, after)) => tokio::time::timeout_at(deadline, guarded)
                .await
                .map_err(|_| VectorError::TimedOut { operation, after })?,
            None => guarded.await,
        }
    }
}

/// Gate opened once startup (collection check, model load) has completed.
#[derive(Debug, Clone, Default)]
pub struct Readiness(Arc<AtomicBool>);

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gate that is already open, for components used standalone.
    pub fn ready() -> Self {
        let readiness = Self::new();
        readiness.mark_ready();
        readiness
    }

    pub fn mark_ready(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn ensure_ready(&self) -> VectorResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(VectorError::NotInitialized)
        }
    }
}
