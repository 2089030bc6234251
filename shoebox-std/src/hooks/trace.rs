//! Span-per-delivery hook.

use shoebox_core::{BoxError, Hook, HookResult, Message, Routable};
use tracing::Instrument;

/// Wraps a subscription so every delivery runs inside an `info` span named
/// after the subscriber, carrying the event kind and object key.
pub struct TracingHook<H> {
    inner: H,
    subscriber: String,
}

impl<H> TracingHook<H> {
    /// Wraps `inner`, labelling spans with `subscriber`.
    pub fn new(inner: H, subscriber: impl Into<String>) -> Self {
        Self {
            inner,
            subscriber: subscriber.into(),
        }
    }
}

impl<E, H> Hook<E> for TracingHook<H>
where
    E: Message + Routable + Sync,
    H: Hook<E>,
{
    async fn on_event(&self, event: &E) -> Result<HookResult, BoxError> {
        let span = tracing::info_span!(
            "deliver",
            subscriber = %self.subscriber,
            kind = ?event.kind(),
            key = event.attribute(shoebox_core::attr::OBJECT_NAME).unwrap_or_default(),
        );
        let result = self.inner.on_event(event).instrument(span.clone()).await;
        span.in_scope(|| match &result {
            Ok(outcome) => tracing::trace!(?outcome, "delivery finished"),
            Err(error) => tracing::warn!(%error, "delivery failed"),
        });
        result
    }
}
