use crate::error::ServiceError;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-call context handed to a service's `start` or `stop`.
///
/// Carries the deadline the orchestrator enforces for this call and a
/// cancellation token that is cancelled once that deadline has passed.
/// Services are free to ignore both; the orchestrator stops waiting at the
/// deadline either way.
#[derive(Debug, Clone)]
pub struct CallContext {
    deadline: Instant,
    cancellation_token: CancellationToken,
}

impl CallContext {
    /// Create a context whose deadline is `timeout` from now
    pub fn new(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Resolves once the orchestrator has given up on this call
    pub async fn cancelled(&self) {
        self.cancellation_token.cancelled().await
    }

    pub(crate) fn cancel(&self) {
        self.cancellation_token.cancel();
    }
}

/// A managed component with a start/stop lifecycle.
///
/// Implementations may block for as long as they like; the orchestrator
/// bounds every call with its own deadline and never issues two calls to
/// the same service concurrently.
///
/// `stop` must succeed as a no-op when the service was never started.
#[async_trait::async_trait]
pub trait Service: Send + Sync {
    /// Name used in logs, errors and reports
    fn name(&self) -> &str;

    async fn start(&self, ctx: CallContext) -> Result<(), ServiceError>;

    async fn stop(&self, ctx: CallContext) -> Result<(), ServiceError>;
}
