//! # Side-Effect Layer (Handler)
//!
//! The terminal point of an event processing pipeline: the place where
//! records are written and notifications are sent.
//!
//! # Usage Patterns
//!
//! 1. **Direct closure**: `|event| async move { ... }`
//! 2. **Struct implementation**: `impl Handler<IngestionEvent> for MyHandler`
//!
//! Handlers used behind a queue return `Result<(), HandlerError>` so the
//! dispatcher can acknowledge or retain each item independently.

use crate::message::Message;
use std::future::Future;

/// A marker trait for the result of an endpoint execution.
pub trait HandlerResult: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> HandlerResult for T {}

/// The terminal endpoint of an event processing pipeline.
///
/// Handlers receive a fully owned message and perform async side effects.
/// Connected to a [`Listener`] via [`Pipeline`], the combination becomes a
/// [`Hook`].
///
/// [`Listener`]: crate::Listener
/// [`Pipeline`]: crate::Pipeline
/// [`Hook`]: crate::Hook
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot handle input of type `{In}`",
    label = "missing `Handler<{In}>` implementation",
    note = "Handlers must implement the `call` method for the input type `{In}`."
)]
pub trait Handler<In: Message>: Send + Sync + 'static {
    /// The output type of the handler, usually `()` or `Result`.
    type Output: HandlerResult;

    /// Executes the handler logic.
    fn call(&self, input: In) -> impl Future<Output = Self::Output> + Send;
}

// Blanket impl for closures
impl<F, In, Out, Fut> Handler<In> for F
where
    In: Message,
    Out: HandlerResult,
    F: Fn(In) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Out> + Send,
{
    type Output = Out;

    fn call(&self, input: In) -> impl Future<Output = Self::Output> + Send {
        (self)(input)
    }
}
