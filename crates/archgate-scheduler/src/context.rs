//! Per-decision context: cancellation and deadline.

use std::future::Future;
use std::time::Duration;

use archgate_registry::{ResolveError, ResolveResult};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Carries the scheduler's cancellation signal and deadline into a
/// decision. Cloning shares the same token.
#[derive(Debug, Clone)]
pub struct DecisionContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    budget: Option<Duration>,
}

impl Default for DecisionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionContext {
    /// No deadline, not cancelled.
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
            budget: None,
        }
    }

    /// Deadline `timeout` from now. A timeout too large for `Instant` to
    /// represent leaves the context unbounded.
    pub fn with_timeout(timeout: Duration) -> Self {
        let deadline = Instant::now().checked_add(timeout);
        Self {
            cancel: CancellationToken::new(),
            deadline,
            budget: deadline.map(|_| timeout),
        }
    }

    /// A context cancelled along with `self`, sharing its deadline.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
            budget: self.budget,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Drive `fut` until it completes, the deadline passes, or the context
    /// is cancelled. The future is dropped on the latter two.
    pub async fn run<F, T>(&self, fut: F) -> ResolveResult<T>
    where
        F: Future<Output = ResolveResult<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }

        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, fut)
                    .await
                    .map_err(|_| ResolveError::Timeout(self.budget.unwrap_or_default()))?,
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ResolveError::Cancelled),
            result = bounded => result,
        }
    }
}
