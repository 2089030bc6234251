//! Timeout hook for time-limited execution.

use shoebox_core::{BoxError, Hook, HookResult, Message};
use std::time::Duration;
use tokio::time::timeout;

/// Error returned when a hook times out.
#[derive(Debug, Clone, thiserror::Error)]
#[error("hook execution timed out after {0:?}")]
pub struct TimeoutError(pub Duration);

/// A hook that wraps another hook with a timeout.
///
/// When the limit is reached the inner future is dropped, cancelling whatever
/// I/O it had outstanding.
pub struct TimeoutHook<H> {
    inner: H,
    duration: Duration,
}

impl<H> TimeoutHook<H> {
    /// Create a new timeout hook.
    pub fn new(inner: H, duration: Duration) -> Self {
        Self { inner, duration }
    }

    /// The time limit.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl<E: Message + Sync, H: Hook<E>> Hook<E> for TimeoutHook<H> {
    async fn on_event(&self, event: &E) -> Result<HookResult, BoxError> {
        match timeout(self.duration, self.inner.on_event(event)).await {
            Ok(result) => result,
            Err(_) => Err(Box::new(TimeoutError(self.duration))),
        }
    }
}
