//! Batch queues.
//!
//! A [`BatchQueue`] buffers messages between a topic subscription and a
//! [`Dispatcher`](crate::dispatch::Dispatcher). [`QueueSink`] is the handler a
//! topic subscription uses to put events on a queue.

pub mod batch;
pub mod config;
pub mod envelope;
pub mod sink;

pub use batch::BatchQueue;
pub use config::{QueueConfig, RedrivePolicy};
pub use envelope::{DEAD_LETTER_SOURCE, Envelope, MessageId, RECEIVE_COUNT, ReceiptHandle};
pub use sink::QueueSink;
