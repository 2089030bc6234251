//! Test doubles for hooks, handlers, stores and notifiers.
//!
//! Every double is cheap to clone and clones share state, so a test keeps one
//! copy for assertions and hands the other to the pipeline.
//!
//! ```rust,ignore
//! let recorder = RecordingHandler::<IngestionEvent>::new();
//! let topic = Topic::builder("images")
//!     .subscribe_filtered("create", SubscriptionFilter::kind(EventKind::Created), recorder.clone())?
//!     .build();
//! topic.publish(&IngestionEvent::created("a.png")).await;
//! assert_eq!(recorder.count(), 1);
//! ```

use async_trait::async_trait;
use shoebox_core::{
    BoxError, FieldUpdate, Handler, Hook, HookResult, Message, Notification, Notifier,
    NotifyError, Record, RecordStore, StoreError,
};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU32, Ordering},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Recording Hook
// ============================================================================

/// A hook that records all events it receives and answers with a fixed result.
pub struct RecordingHook<E: Clone> {
    events: Arc<Mutex<Vec<E>>>,
    result: HookResult,
}

impl<E: Clone> RecordingHook<E> {
    /// Create a new recording hook that returns `Stop`.
    pub fn new() -> Self {
        Self::with_result(HookResult::Stop)
    }

    /// Create a recording hook that returns a specific result.
    pub fn with_result(result: HookResult) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            result,
        }
    }

    /// Get a clone of the recorded events.
    pub fn events(&self) -> Vec<E> {
        lock(&self.events).clone()
    }

    /// Get the number of recorded events.
    pub fn count(&self) -> usize {
        lock(&self.events).len()
    }
}

impl<E: Clone> Default for RecordingHook<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> Clone for RecordingHook<E> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            result: self.result,
        }
    }
}

impl<E: Message + Clone + Sync> Hook<E> for RecordingHook<E> {
    async fn on_event(&self, event: &E) -> Result<HookResult, BoxError> {
        lock(&self.events).push(event.clone());
        Ok(self.result)
    }
}

// ============================================================================
// Recording Handler
// ============================================================================

/// A handler that records its inputs and always succeeds.
pub struct RecordingHandler<E> {
    inputs: Arc<Mutex<Vec<E>>>,
}

impl<E> RecordingHandler<E> {
    /// Create a new recording handler.
    pub fn new() -> Self {
        Self {
            inputs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of calls so far.
    pub fn count(&self) -> usize {
        lock(&self.inputs).len()
    }
}

impl<E: Clone> RecordingHandler<E> {
    /// Inputs received, in call order.
    pub fn inputs(&self) -> Vec<E> {
        lock(&self.inputs).clone()
    }
}

impl<E> Default for RecordingHandler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for RecordingHandler<E> {
    fn clone(&self) -> Self {
        Self {
            inputs: self.inputs.clone(),
        }
    }
}

impl<E: Message> Handler<E> for RecordingHandler<E> {
    type Output = ();

    async fn call(&self, input: E) -> Self::Output {
        lock(&self.inputs).push(input);
    }
}

// ============================================================================
// Notifiers
// ============================================================================

/// A notifier that keeps every notification instead of sending it.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications sent so far.
    pub fn sent(&self) -> Vec<Notification> {
        lock(&self.sent).clone()
    }

    /// Number of notifications sent.
    pub fn count(&self) -> usize {
        lock(&self.sent).len()
    }

    /// Subjects of the notifications sent, in order.
    pub fn subjects(&self) -> Vec<String> {
        lock(&self.sent).iter().map(|n| n.subject.clone()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        lock(&self.sent).push(notification);
        Ok(())
    }
}

/// A notifier that fails a programmed number of sends before delivering.
#[derive(Clone)]
pub struct FailingNotifier {
    failures: Arc<AtomicU32>,
    attempts: Arc<AtomicU32>,
    transient: bool,
    delivered: RecordingNotifier,
}

impl FailingNotifier {
    /// Fails the next `failures` sends with a transport error.
    pub fn transient(failures: u32) -> Self {
        Self {
            failures: Arc::new(AtomicU32::new(failures)),
            attempts: Arc::new(AtomicU32::new(0)),
            transient: true,
            delivered: RecordingNotifier::new(),
        }
    }

    /// Rejects every send.
    pub fn rejecting() -> Self {
        Self {
            transient: false,
            ..Self::transient(u32::MAX)
        }
    }

    /// Number of send attempts, failed or not.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Notifications that went through.
    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.sent()
    }
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let fail = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        match (fail, self.transient) {
            (false, _) => self.delivered.send(notification).await,
            (true, true) => Err(NotifyError::Transport("connection reset".into())),
            (true, false) => Err(NotifyError::Rejected("address not verified".into())),
        }
    }
}

// ============================================================================
// Flaky Store
// ============================================================================

/// Wraps a store and fails its next N calls with [`StoreError::Unavailable`].
pub struct FlakyStore<S> {
    inner: S,
    failures: AtomicU32,
    calls: AtomicU32,
}

impl<S: RecordStore> FlakyStore<S> {
    /// Fails the first `failures` calls, then delegates to `inner`.
    pub fn new(inner: S, failures: u32) -> Self {
        Self {
            inner,
            failures: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of calls made, including failed ones.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Arms the store to fail its next `failures` calls.
    pub fn fail_next(&self, failures: u32) {
        self.failures.store(failures, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(_) => Err(StoreError::Unavailable("simulated outage".into())),
            Err(_) => Ok(()),
        }
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for FlakyStore<S> {
    async fn get(&self, key: &str) -> Result<Option<Record>, StoreError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn put(&self, record: Record) -> Result<Option<Record>, StoreError> {
        self.check()?;
        self.inner.put(record).await
    }

    async fn update(&self, key: &str, update: FieldUpdate) -> Result<Option<Record>, StoreError> {
        self.check()?;
        self.inner.update(key, update).await
    }

    async fn delete(&self, key: &str) -> Result<Option<Record>, StoreError> {
        self.check()?;
        self.inner.delete(key).await
    }
}
