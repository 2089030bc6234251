//! Retry hook for direct subscriptions.
//!
//! A direct subscription has no queue behind it to redeliver, so transient
//! failures are retried in place. Errors a [`HandlerError`] reports as
//! permanent are returned on the first attempt.

use shoebox_core::{BoxError, HandlerError, Hook, HookResult, Message};
use std::time::Duration;

/// Re-runs the inner hook on error, up to a fixed number of attempts.
pub struct RetryHook<H> {
    inner: H,
    attempts: u32,
    backoff: Duration,
}

impl<H> RetryHook<H> {
    /// Wraps `inner`; `attempts` counts the first try and is at least 1.
    pub fn new(inner: H, attempts: u32) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            backoff: Duration::from_millis(200),
        }
    }

    /// Sets the delay before the first retry. It doubles on each further retry.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Maximum number of attempts.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

fn is_permanent(error: &BoxError) -> bool {
    error
        .downcast_ref::<HandlerError>()
        .is_some_and(HandlerError::is_permanent)
}

impl<E: Message + Sync, H: Hook<E>> Hook<E> for RetryHook<H> {
    async fn on_event(&self, event: &E) -> Result<HookResult, BoxError> {
        let mut delay = self.backoff;
        let mut attempt = 1;
        loop {
            match self.inner.on_event(event).await {
                Ok(result) => return Ok(result),
                Err(error) if attempt >= self.attempts || is_permanent(&error) => return Err(error),
                Err(error) => {
                    tracing::debug!(attempt, max = self.attempts, %error, "attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoebox_core::{NotifyError, ValidationError};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FailTimes {
        remaining: AtomicU32,
        calls: AtomicU32,
        error: fn() -> HandlerError,
    }

    impl FailTimes {
        fn new(times: u32, error: fn() -> HandlerError) -> Self {
            Self {
                remaining: AtomicU32::new(times),
                calls: AtomicU32::new(0),
                error,
            }
        }
    }

    impl Hook<u32> for FailTimes {
        async fn on_event(&self, _event: &u32) -> Result<HookResult, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let failed = self
                .remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failed {
                Err(Box::new((self.error)()))
            } else {
                Ok(HookResult::Stop)
            }
        }
    }

    fn transient() -> HandlerError {
        NotifyError::Transport("connection reset".into()).into()
    }

    fn permanent() -> HandlerError {
        ValidationError::MissingAttribute("name").into()
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let hook = RetryHook::new(FailTimes::new(2, transient), 3);
        assert_eq!(hook.on_event(&1).await.unwrap(), HookResult::Stop);
        assert_eq!(hook.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_attempts() {
        let hook = RetryHook::new(FailTimes::new(5, transient), 3);
        assert!(hook.on_event(&1).await.is_err());
        assert_eq!(hook.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failures_are_not_retried() {
        let hook = RetryHook::new(FailTimes::new(5, permanent), 3);
        assert!(hook.on_event(&1).await.is_err());
        assert_eq!(hook.inner.calls.load(Ordering::SeqCst), 1);
    }
}
