//! # Primitive Kernel Layer (Hook)
//!
//! The lowest-level entry point for event processing in Shoebox.
//!
//! A topic only knows hooks: each subscription, whether it forwards into a
//! batch queue or invokes a handler directly, is compiled down to a Hook that
//! receives the event and reports whether it took responsibility for it.
//!
//! # Use Cases
//!
//! - Observing events (logging, tracing spans)
//! - Bounding execution time or retrying a delivery
//! - Wrapping Listener + Handler pipelines for execution

use crate::{error::BoxError, message::Message};
use std::{future::Future, pin::Pin};

/// Result of hook execution indicating whether the event was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookResult {
    /// The event was not relevant to this hook (e.g. filtered out).
    Next,
    /// The event was delivered and handled by this hook.
    Stop,
}

impl HookResult {
    /// Returns `true` if the hook took the event.
    pub const fn is_delivered(self) -> bool {
        matches!(self, HookResult::Stop)
    }
}

/// The primitive kernel for event processing.
///
/// This trait uses native `async fn` for zero-cost static dispatch.
/// For dynamic dispatch (e.g. a topic's subscriber list), use [`DynHook`].
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Hook<{E}>`",
    label = "missing `Hook` implementation",
    note = "Hooks must implement `on_event` for the specific event type `{E}`."
)]
pub trait Hook<E: Message>: Send + Sync + 'static {
    /// Called when an event is delivered.
    fn on_event(&self, event: &E) -> impl Future<Output = Result<HookResult, BoxError>> + Send;
}

/// Dynamic object-safe version of [`Hook`].
pub trait DynHook<E: Message>: Send + Sync + 'static {
    /// Called when an event is delivered (dynamic dispatch version).
    fn on_event_dyn<'a>(
        &'a self,
        event: &'a E,
    ) -> Pin<Box<dyn Future<Output = Result<HookResult, BoxError>> + Send + 'a>>;
}

// Any type implementing Hook implements DynHook automatically.
impl<E: Message, T: Hook<E>> DynHook<E> for T {
    fn on_event_dyn<'a>(
        &'a self,
        event: &'a E,
    ) -> Pin<Box<dyn Future<Output = Result<HookResult, BoxError>> + Send + 'a>> {
        Box::pin(self.on_event(event))
    }
}

impl<E: Message> Hook<E> for Box<dyn DynHook<E>> {
    async fn on_event(&self, event: &E) -> Result<HookResult, BoxError> {
        // Through the trait object, not the blanket impl on the box itself.
        (**self).on_event_dyn(event).await
    }
}

impl<E: Message, H: Hook<E>> Hook<E> for std::sync::Arc<H> {
    fn on_event(&self, event: &E) -> impl Future<Output = Result<HookResult, BoxError>> + Send {
        self.as_ref().on_event(event)
    }
}
