//! Cooperative cancellation and per-stage deadlines.

use crate::{DocvaultError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Shared flag that asks a running ingestion to stop at the next unit boundary.
///
/// Clones observe the same flag. Cancelling is idempotent.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`CancellationToken::cancel`] has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Time budget of one stage, combined with the run's cancellation token.
#[derive(Debug, Clone)]
pub struct StageGuard {
    stage: &'static str,
    started: Instant,
    budget: Duration,
    token: CancellationToken,
}

impl StageGuard {
    pub fn new(stage: &'static str, budget: Duration, token: &CancellationToken) -> Self {
        Self {
            stage,
            started: Instant::now(),
            budget,
            token: token.clone(),
        }
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// `Cancelled` or `Timeout` once the run should stop, otherwise `Ok`.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(DocvaultError::Cancelled);
        }
        if self.started.elapsed() >= self.budget {
            return Err(self.timeout_error());
        }
        Ok(())
    }

    pub fn timeout_error(&self) -> DocvaultError {
        DocvaultError::Timeout {
            stage: self.stage.to_string(),
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}
