//! Execution context for storage tasks
//!
//! Every network call of a command runs under one [`TaskContext`], which
//! carries the command deadline and a cancellation token. Clones share the
//! same deadline and token, so a context can be handed to concurrent workers.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Default upper bound for one command
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Deadline and cancellation shared by the calls of one command
#[derive(Debug, Clone)]
pub struct TaskContext {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl TaskContext {
    /// A context that never expires but can still be cancelled
    pub fn new() -> Self {
        Self {
            deadline: None,
            token: CancellationToken::new(),
        }
    }

    /// A context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            token: CancellationToken::new(),
        }
    }

    /// Token that cancels this context (and its clones) when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Time left before the deadline, if any
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Whether the context is cancelled or past its deadline
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail fast if the context is already finished
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(Error::Cancelled(operation.to_string()));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Error::DeadlineExceeded(operation.to_string()));
        }
        Ok(())
    }

    /// Run one storage call, racing it against the deadline and the token
    ///
    /// The call's future is dropped when the context finishes first.
    pub async fn run<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check(operation)?;

        let expiry = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Error::Cancelled(operation.to_string())),
            _ = expiry => {
                tracing::debug!(operation, "deadline exceeded");
                Err(Error::DeadlineExceeded(operation.to_string()))
            }
            result = call => result,
        }
    }
}

impl Default for TaskContext {
    fn default() -> Self {
        Self::new()
    }
}
