//! # shoebox-core
//!
//! Core traits and domain vocabulary for the Shoebox album event pipeline.
//!
//! This crate has minimal dependencies and is what store backends, notifier
//! transports and custom handlers import. Concrete routers, queues and
//! dispatchers live in `shoebox-std`.
//!
//! # Processing Layers
//!
//! ## Layer 1: Primitive Kernel ([`Hook`])
//!
//! Receives an event, returns `Next` or `Stop`. Every subscription attached to
//! a topic is, in the end, a Hook.
//!
//! ## Layer 2: Gatekeeping ([`Listener`])
//!
//! Decides whether an event is relevant and what it becomes: subscription
//! filters are listeners, and so is anything that reshapes an event before a
//! handler sees it.
//!
//! ## Layer 3: Distribution ([`Router`])
//!
//! Hands one event to many subscribers. From the outside a router is just
//! another processing step; [`RouterHook`] turns one into a Hook.
//!
//! ## Layer 4: Side Effects ([`Handler`])
//!
//! The terminal point where records are written and notifications are sent.
//!
//! # Domain
//!
//! - [`IngestionEvent`] / [`EventKind`] - what the pipeline reacts to
//! - [`Record`] / [`RecordStore`] - what it mutates, [`RecordChange`] - how an edit landed
//! - [`Notification`] / [`Notifier`] - who it tells
//!
//! # Error Types
//!
//! - [`HandlerError`] - per-item outcome of a handler, classified permanent or transient
//! - [`ValidationError`], [`StoreError`], [`NotifyError`], [`DecodeError`] - the leaves
//! - [`ShoeboxError`] - top-level error type

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod error;
mod event;
mod handler;
mod hook;
mod listener;
mod message;
mod notify;
mod record;
mod response;
mod router;

// Re-exports
pub use error::{
    BoxError, ConfigError, DecodeError, HandlerError, NotifyError, QueueError, RoutingError,
    ShoeboxError, StoreError, ValidationError,
};
pub use event::{EventKind, IngestionEvent, Routable, attr};
pub use handler::{Handler, HandlerResult};
pub use hook::{DynHook, Hook, HookResult};
pub use listener::{Filter, Listener, Map, Pipeline};
pub use message::Message;
pub use notify::{Notification, Notifier};
pub use record::{FieldUpdate, Record, RecordChange, RecordStore};
pub use response::IntoResponse;
pub use router::{RouteResult, Router, RouterHook};
