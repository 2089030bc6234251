//! # shoebox-std
//!
//! Standard implementations for the Shoebox event pipeline.
//!
//! This crate provides:
//! - **Routing**: [`Topic`] with [`SubscriptionFilter`]-based fan-out
//! - **Queues**: [`BatchQueue`] with batching, visibility timeouts and
//!   dead-letter redrive, fed by [`QueueSink`]
//! - **Dispatch**: [`Dispatcher`] with per-item acknowledgment
//! - **Standard hooks**: Tracing, Retry, Timeout
//! - **Wire formats**: storage and topic notifications, update triggers
//! - **Adapters**: [`InMemoryRecordStore`], [`LogNotifier`]
//! - **Testing**: recording and failing doubles

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use shoebox_core;

// Modules
pub mod dispatch;
pub mod hooks;
pub mod notify;
pub mod queue;
pub mod routing;
pub mod store;
pub mod testing;
pub mod wire;

pub use dispatch::{
    BatchReport, DeadLetter, DeadLetterDecoder, Dispatcher, EnvelopeDecoder, FailurePolicy,
    ItemFailure, TopicEnvelopeDecoder,
};
pub use hooks::{RetryHook, TimeoutError, TimeoutHook, TracingHook};
pub use notify::LogNotifier;
pub use queue::{BatchQueue, Envelope, MessageId, QueueConfig, QueueSink, ReceiptHandle, RedrivePolicy};
pub use routing::{StringMatch, Subscription, SubscriptionFilter, Topic, TopicBuilder};
pub use store::InMemoryRecordStore;
