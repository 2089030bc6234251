//! Filtered fan-out topic.
//!
//! A [`Topic`] accepts published events and hands an independent copy to
//! every subscription whose filter matches. Subscriptions run concurrently;
//! the outcome of one never affects another, and nothing is reported back to
//! the publisher beyond a [`RouteResult`] tally. Once an event reaches a
//! subscriber's ingress (a queue or a direct handler call), the topic is done
//! with it.

use crate::routing::filter::SubscriptionFilter;
use futures::future::join_all;
use shoebox_core::{
    DynHook, Handler, Hook, HookResult, IntoResponse, Listener, Message, Routable, RouteResult,
    Router, RoutingError,
};
use std::convert::Infallible;

/// One named subscriber.
pub struct Subscription<E: Message> {
    name: String,
    hook: Box<dyn DynHook<E>>,
}

impl<E: Message> Subscription<E> {
    /// Subscription name, used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A publish/subscribe topic with filtered fan-out.
pub struct Topic<E: Message> {
    name: String,
    subscriptions: Vec<Subscription<E>>,
}

impl<E: Message> Topic<E> {
    /// Starts building a topic.
    pub fn builder(name: impl Into<String>) -> TopicBuilder<E> {
        TopicBuilder {
            name: name.into(),
            subscriptions: Vec::new(),
        }
    }

    /// Topic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered subscriptions, in registration order.
    pub fn subscriptions(&self) -> &[Subscription<E>] {
        &self.subscriptions
    }

    /// Delivers `event` to every matching subscriber.
    ///
    /// Subscriber failures are logged and counted, never propagated.
    pub async fn publish(&self, event: &E) -> RouteResult {
        let deliveries = self.subscriptions.iter().map(|sub| async move {
            let outcome = sub.hook.as_ref().on_event_dyn(event).await;
            (sub, outcome)
        });

        let mut result = RouteResult::default();
        for (sub, outcome) in join_all(deliveries).await {
            match outcome {
                Ok(HookResult::Stop) => {
                    result.delivered += 1;
                    tracing::debug!(topic = %self.name, subscription = %sub.name, "delivered");
                }
                Ok(HookResult::Next) => result.skipped += 1,
                Err(source) => {
                    result.failed += 1;
                    let err = RoutingError::Subscriber {
                        name: sub.name.clone(),
                        source,
                    };
                    tracing::warn!(topic = %self.name, error = %err, cause = ?err, "delivery failed");
                }
            }
        }
        result
    }
}

impl<E: Message> Router<E> for Topic<E> {
    type Error = Infallible;

    async fn route(&self, event: &E) -> Result<RouteResult, Self::Error> {
        Ok(self.publish(event).await)
    }
}

/// Builder for constructing a [`Topic`].
pub struct TopicBuilder<E: Message> {
    name: String,
    subscriptions: Vec<Subscription<E>>,
}

impl<E: Message> TopicBuilder<E> {
    /// Attaches a hook under `name`.
    ///
    /// The hook decides for itself whether an event is relevant: returning
    /// [`HookResult::Next`] counts as skipped.
    pub fn subscribe<H>(mut self, name: impl Into<String>, hook: H) -> Result<Self, RoutingError>
    where
        H: Hook<E>,
    {
        let name = name.into();
        if self.subscriptions.iter().any(|s| s.name == name) {
            return Err(RoutingError::AlreadyExists(name));
        }
        self.subscriptions.push(Subscription {
            name,
            hook: Box::new(hook),
        });
        Ok(self)
    }

    /// Attaches `handler` behind `filter`.
    pub fn subscribe_filtered<H>(
        self,
        name: impl Into<String>,
        filter: SubscriptionFilter,
        handler: H,
    ) -> Result<Self, RoutingError>
    where
        E: Routable + Clone,
        H: Handler<E>,
        H::Output: IntoResponse,
    {
        self.subscribe(name, Listener::<E>::handler(filter, handler))
    }

    /// Builds the topic.
    pub fn build(self) -> Topic<E> {
        Topic {
            name: self.name,
            subscriptions: self.subscriptions,
        }
    }
}
