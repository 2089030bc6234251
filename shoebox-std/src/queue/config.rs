//! Queue tuning.

use std::time::Duration;

/// Batching and visibility settings of a [`BatchQueue`](super::BatchQueue).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum messages released per batch; 0 is treated as 1.
    pub batch_size: usize,
    /// Maximum wait before a partial batch is released.
    pub max_batching_window: Duration,
    /// How long a delivered message stays hidden awaiting acknowledgment.
    pub visibility_timeout: Duration,
    /// Messages older than this are discarded; `None` keeps them forever.
    pub retention: Option<Duration>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_batching_window: Duration::ZERO,
            visibility_timeout: Duration::from_secs(30),
            retention: None,
        }
    }
}

impl QueueConfig {
    /// Sets the batch size (at least 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Sets the batching window.
    pub fn with_batching_window(mut self, window: Duration) -> Self {
        self.max_batching_window = window;
        self
    }

    /// Sets the visibility timeout.
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    /// Sets the retention period.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = Some(retention);
        self
    }
}

/// Where a queue sends messages that keep failing.
#[derive(Clone)]
pub struct RedrivePolicy {
    /// Target queue. It must not have a redrive policy of its own.
    pub dead_letter: std::sync::Arc<super::BatchQueue>,
    /// Failed deliveries tolerated before a message is moved.
    pub max_receive_count: u32,
}

impl std::fmt::Debug for RedrivePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedrivePolicy")
            .field("dead_letter", &self.dead_letter.name())
            .field("max_receive_count", &self.max_receive_count)
            .finish()
    }
}
