//! Topic-to-queue subscription handler.

use super::BatchQueue;
use crate::wire;
use shoebox_core::{Handler, IngestionEvent, QueueError};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Forwards events into a [`BatchQueue`], encoded as topic notifications.
///
/// Used as the handler of a queue subscription:
/// `topic.subscribe_filtered("create", filter, QueueSink::new(topic_name, queue))`.
pub struct QueueSink {
    topic: String,
    queue: Arc<BatchQueue>,
    published: AtomicU64,
}

impl QueueSink {
    /// Creates a sink that stamps messages as published on `topic`.
    pub fn new(topic: impl Into<String>, queue: Arc<BatchQueue>) -> Self {
        Self {
            topic: topic.into(),
            queue,
            published: AtomicU64::new(0),
        }
    }

    /// Target queue.
    pub fn queue(&self) -> &Arc<BatchQueue> {
        &self.queue
    }
}

impl Handler<IngestionEvent> for QueueSink {
    type Output = Result<(), QueueError>;

    async fn call(&self, event: IngestionEvent) -> Self::Output {
        let sequence = self.published.fetch_add(1, Ordering::Relaxed);
        let message_id = format!("{}-{sequence}", self.topic);
        let body = wire::encode_queue_body(&event, &self.topic, &message_id)
            .map_err(|e| QueueError::Encode(Box::new(e)))?;
        let id = self.queue.send(body);
        tracing::debug!(
            queue = %self.queue.name(),
            message_id = %id,
            key = %event.source_key,
            "event queued"
        );
        Ok(())
    }
}
