//! # Distribution Layer (Router)
//!
//! A Router hands one event to the subscribers interested in it. Unlike a
//! Listener (which interprets an event), a Router is only concerned with the
//! mechanics of distribution: which subscribers match, and that each of them
//! receives an independent copy.
//!
//! Routers take a reference to the event (`&E`) so every subscriber can
//! inspect the same event; subscribers that need ownership clone.

use crate::{
    error::BoxError,
    hook::{Hook, HookResult},
    message::Message,
};
use std::future::Future;

/// The result of a routing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteResult {
    /// Subscribers that accepted and handled the event.
    pub delivered: usize,
    /// Subscribers whose filter did not match.
    pub skipped: usize,
    /// Subscribers that matched but failed.
    pub failed: usize,
}

impl RouteResult {
    /// Total number of subscribers consulted.
    pub const fn total(&self) -> usize {
        self.delivered + self.skipped + self.failed
    }

    /// Returns `true` if at least one subscriber received the event.
    pub const fn reached_any(&self) -> bool {
        self.delivered > 0
    }
}

impl std::ops::AddAssign for RouteResult {
    fn add_assign(&mut self, other: Self) {
        self.delivered += other.delivered;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// The distribution interface.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot route events of type `{E}`",
    label = "missing `Router` implementation",
    note = "Implement `Router<{E}>` to handle event routing."
)]
pub trait Router<E: Message>: Send + Sync {
    /// Error returned when routing itself (not a subscriber) fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Routes `event` to every interested subscriber.
    fn route(&self, event: &E) -> impl Future<Output = Result<RouteResult, Self::Error>> + Send;
}

/// A wrapper that allows a [`Router`] to be used as a [`Hook`], so one topic
/// can subscribe to another.
pub struct RouterHook<R> {
    router: R,
}

impl<R> RouterHook<R> {
    /// Wraps a router.
    pub fn new(router: R) -> Self {
        Self { router }
    }

    /// Returns the wrapped router.
    pub fn inner(&self) -> &R {
        &self.router
    }
}

impl<E, R> Hook<E> for RouterHook<R>
where
    E: Message,
    R: Router<E> + 'static,
{
    async fn on_event(&self, event: &E) -> Result<HookResult, BoxError> {
        let result = self
            .router
            .route(event)
            .await
            .map_err(|e| Box::new(e) as BoxError)?;

        if result.reached_any() {
            Ok(HookResult::Stop)
        } else {
            Ok(HookResult::Next)
        }
    }
}
