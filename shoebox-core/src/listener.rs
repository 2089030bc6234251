//! # Gatekeeping Layer (Listener)
//!
//! A Listener decides whether an event is relevant and what it turns into
//! before a handler sees it.
//!
//! # Responsibilities
//!
//! 1. **Gatekeeping**: drop events a subscriber did not ask for.
//! 2. **Interpretation**: reshape an event into the input a handler expects.
//! 3. **Delegation**: hand the result to a [`Handler`] via [`Pipeline`].

use crate::{
    error::BoxError,
    handler::{Handler, HandlerResult},
    hook::{Hook, HookResult},
    message::Message,
    response::IntoResponse,
};
use std::future::Future;

/// A gatekeeper that interprets events.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Listener` for `{In}`",
    label = "missing `Listener` implementation",
    note = "Listeners must implement the `listen` method to process `{In}`."
)]
pub trait Listener<In: Message>: Send + Sync + 'static {
    /// What the listener produces for events it accepts.
    type Output: Message;

    /// Returns `Ok(None)` for events this listener is not interested in.
    fn listen(
        &self,
        event: &In,
    ) -> impl Future<Output = Result<Option<Self::Output>, BoxError>> + Send;

    /// Filters the output of this listener.
    fn filter<F>(self, predicate: F) -> Filter<Self, F>
    where
        Self: Sized,
        F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
    {
        Filter {
            listener: self,
            predicate,
        }
    }

    /// Transforms the output of this listener.
    fn map<F, Out>(self, mapper: F) -> Map<Self, F, Out>
    where
        Self: Sized,
        Out: Message,
        F: Fn(Self::Output) -> Out + Send + Sync + 'static,
    {
        Map {
            listener: self,
            mapper,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Connects to a handler, producing a [`Hook`].
    fn handler<H>(self, handler: H) -> Pipeline<Self, H>
    where
        Self: Sized,
        H: Handler<Self::Output>,
    {
        Pipeline {
            listener: self,
            handler,
        }
    }
}

/// Drops outputs for which the predicate is false.
pub struct Filter<L, F> {
    listener: L,
    predicate: F,
}

impl<L, F, In> Listener<In> for Filter<L, F>
where
    In: Message,
    L: Listener<In>,
    F: Fn(&L::Output) -> bool + Send + Sync + 'static,
{
    type Output = L::Output;

    async fn listen(&self, event: &In) -> Result<Option<Self::Output>, BoxError> {
        let Some(output) = self.listener.listen(event).await? else {
            return Ok(None);
        };
        if (self.predicate)(&output) {
            Ok(Some(output))
        } else {
            Ok(None)
        }
    }
}

/// Transforms accepted outputs.
pub struct Map<L, F, Out = ()> {
    listener: L,
    mapper: F,
    _phantom: std::marker::PhantomData<fn() -> Out>,
}

impl<L, F, In, Out> Listener<In> for Map<L, F, Out>
where
    In: Message,
    L: Listener<In>,
    Out: Message,
    F: Fn(L::Output) -> Out + Send + Sync + 'static,
{
    type Output = Out;

    async fn listen(&self, event: &In) -> Result<Option<Self::Output>, BoxError> {
        let Some(output) = self.listener.listen(event).await? else {
            return Ok(None);
        };
        Ok(Some((self.mapper)(output)))
    }
}

/// A listener connected to a handler.
///
/// Events the listener drops yield [`HookResult::Next`]; accepted events are
/// handed to the handler and its output decides the result.
pub struct Pipeline<L, H> {
    /// Gatekeeper.
    pub listener: L,
    /// Terminal handler.
    pub handler: H,
}

impl<L, H, In> Hook<In> for Pipeline<L, H>
where
    In: Message,
    L: Listener<In>,
    H: Handler<L::Output>,
    H::Output: HandlerResult + IntoResponse,
{
    async fn on_event(&self, event: &In) -> Result<HookResult, BoxError> {
        match self.listener.listen(event).await? {
            Some(out) => self.handler.call(out).await.into_response(),
            None => Ok(HookResult::Next),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Passthrough;

    impl Listener<String> for Passthrough {
        type Output = String;

        async fn listen(&self, event: &String) -> Result<Option<String>, BoxError> {
            Ok(Some(event.clone()))
        }
    }

    #[tokio::test]
    async fn filter_map_pipeline() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let pipeline = Passthrough
            .filter(|key: &String| key.ends_with(".png"))
            .map(|key: String| key.to_uppercase())
            .handler(move |key: String| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(key);
                }
            });

        let taken = pipeline.on_event(&"a.png".to_string()).await.unwrap();
        let skipped = pipeline.on_event(&"a.txt".to_string()).await.unwrap();

        assert_eq!(taken, HookResult::Stop);
        assert_eq!(skipped, HookResult::Next);
        assert_eq!(*seen.lock().unwrap(), vec!["A.PNG".to_string()]);
    }
}
