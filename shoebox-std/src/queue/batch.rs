//! In-process batch queue with visibility timeouts and dead-letter redrive.
//!
//! Messages are released in batches, whichever comes first of
//! [`QueueConfig::batch_size`] visible messages or
//! [`QueueConfig::max_batching_window`] since the first of them became
//! available. A delivered message stays hidden for the visibility timeout; if
//! it is not acknowledged by then it becomes visible again and the delivery
//! counts as failed. Once a message has failed more than
//! [`RedrivePolicy::max_receive_count`] times it is moved to the dead-letter
//! queue instead of being redelivered.
//!
//! Acknowledgment is per message. A consumer that handles four messages of a
//! batch and fails the fifth acknowledges four receipts; the fifth comes back
//! on its own.

use super::{
    config::{QueueConfig, RedrivePolicy},
    envelope::{DEAD_LETTER_SOURCE, Envelope, MessageId, RECEIVE_COUNT, ReceiptHandle},
};
use shoebox_core::QueueError;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard, PoisonError},
};
use tokio::{
    sync::Notify,
    time::{Instant, sleep_until},
};

#[derive(Debug)]
enum Slot {
    Visible,
    InFlight { receipt: ReceiptHandle, until: Instant },
}

#[derive(Debug)]
struct Stored {
    body: String,
    attributes: BTreeMap<String, String>,
    sent_at: Instant,
    receive_count: u32,
    failed_deliveries: u32,
    slot: Slot,
}

#[derive(Debug, Default)]
struct State {
    messages: BTreeMap<MessageId, Stored>,
    in_flight: HashMap<ReceiptHandle, MessageId>,
    next_id: u64,
    window_opened: Option<Instant>,
}

impl State {
    fn visible_len(&self) -> usize {
        self.messages
            .values()
            .filter(|m| matches!(m.slot, Slot::Visible))
            .count()
    }

    fn next_expiry(&self) -> Option<Instant> {
        self.messages
            .values()
            .filter_map(|m| match m.slot {
                Slot::InFlight { until, .. } => Some(until),
                Slot::Visible => None,
            })
            .min()
    }
}

/// What `poll_batch` decided.
enum Poll {
    Ready(Vec<Envelope>),
    Wait(Option<Instant>),
}

/// A buffering channel between a topic and a consumer.
pub struct BatchQueue {
    name: String,
    config: QueueConfig,
    redrive: Option<RedrivePolicy>,
    state: Mutex<State>,
    notify: Notify,
}

impl std::fmt::Debug for BatchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchQueue")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("redrive", &self.redrive)
            .finish_non_exhaustive()
    }
}

impl BatchQueue {
    /// Creates a queue without a dead-letter target.
    pub fn new(name: impl Into<String>, config: QueueConfig) -> Self {
        Self {
            name: name.into(),
            config,
            redrive: None,
            state: Mutex::new(State::default()),
            notify: Notify::new(),
        }
    }

    /// Creates a queue that moves repeatedly failing messages to `redrive.dead_letter`.
    pub fn with_redrive(name: impl Into<String>, config: QueueConfig, redrive: RedrivePolicy) -> Self {
        Self {
            redrive: Some(redrive),
            ..Self::new(name, config)
        }
    }

    /// Queue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue settings.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// The redrive policy, if any.
    pub fn redrive(&self) -> Option<&RedrivePolicy> {
        self.redrive.as_ref()
    }

    /// Number of stored messages, visible or in flight.
    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    /// Returns `true` if no message is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of messages currently delivered and awaiting acknowledgment.
    pub fn in_flight_len(&self) -> usize {
        self.lock().in_flight.len()
    }

    /// Number of messages currently eligible for delivery.
    pub fn visible_len(&self) -> usize {
        self.lock().visible_len()
    }

    /// Enqueues a message.
    pub fn send(&self, body: impl Into<String>) -> MessageId {
        self.send_with_attributes(body, BTreeMap::new())
    }

    /// Enqueues a message carrying attributes.
    pub fn send_with_attributes(
        &self,
        body: impl Into<String>,
        attributes: BTreeMap<String, String>,
    ) -> MessageId {
        let id = {
            let mut state = self.lock();
            let id = MessageId(state.next_id);
            state.next_id += 1;
            state.messages.insert(
                id,
                Stored {
                    body: body.into(),
                    attributes,
                    sent_at: Instant::now(),
                    receive_count: 0,
                    failed_deliveries: 0,
                    slot: Slot::Visible,
                },
            );
            id
        };
        tracing::trace!(queue = %self.name, message_id = %id, "enqueued");
        self.notify.notify_one();
        id
    }

    /// Takes up to `max` visible messages without waiting.
    pub fn receive(&self, max: usize) -> Vec<Envelope> {
        let now = Instant::now();
        let (batch, moved) = {
            let mut state = self.lock();
            let moved = self.maintain(&mut state, now);
            let batch = self.take(&mut state, max, now);
            (batch, moved)
        };
        self.forward(moved);
        batch
    }

    /// Waits for the next batch according to the batching policy.
    ///
    /// Never returns an empty batch.
    pub async fn next_batch(&self) -> Vec<Envelope> {
        loop {
            let now = Instant::now();
            let (poll, moved) = {
                let mut state = self.lock();
                let moved = self.maintain(&mut state, now);
                (self.poll_batch(&mut state, now), moved)
            };
            self.forward(moved);

            match poll {
                Poll::Ready(batch) => return batch,
                Poll::Wait(Some(deadline)) => {
                    tokio::select! {
                        _ = self.notify.notified() => {}
                        _ = sleep_until(deadline) => {}
                    }
                }
                Poll::Wait(None) => self.notify.notified().await,
            }
        }
    }

    /// Acknowledges one delivery, removing the message for good.
    pub fn ack(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        let mut state = self.lock();
        let id = state
            .in_flight
            .remove(receipt)
            .ok_or_else(|| QueueError::UnknownReceipt(receipt.to_string()))?;
        state.messages.remove(&id);
        tracing::trace!(queue = %self.name, message_id = %id, "acknowledged");
        Ok(())
    }

    /// Ends a delivery early without acknowledging it.
    ///
    /// Counts as a failed delivery; the message is visible again immediately
    /// or, past the redrive threshold, moved to the dead-letter queue.
    pub fn release(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        let now = Instant::now();
        let moved = {
            let mut state = self.lock();
            let id = state
                .in_flight
                .remove(receipt)
                .ok_or_else(|| QueueError::UnknownReceipt(receipt.to_string()))?;
            if let Some(message) = state.messages.get_mut(&id) {
                message.slot = Slot::Visible;
                message.failed_deliveries += 1;
            }
            self.maintain(&mut state, now)
        };
        self.forward(moved);
        self.notify.notify_one();
        Ok(())
    }

    /// Moves one in-flight message straight to the dead-letter queue.
    pub fn dead_letter(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        if self.redrive.is_none() {
            return Err(QueueError::NoDeadLetterQueue(self.name.clone()));
        }
        let message = {
            let mut state = self.lock();
            let id = state
                .in_flight
                .remove(receipt)
                .ok_or_else(|| QueueError::UnknownReceipt(receipt.to_string()))?;
            state.messages.remove(&id).map(|m| (id, m))
        };
        self.forward(message.into_iter().collect());
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Expires visibility timeouts and retention, and picks messages to redrive.
    fn maintain(&self, state: &mut State, now: Instant) -> Vec<(MessageId, Stored)> {
        let mut expired_receipts = Vec::new();
        let mut to_remove = Vec::new();
        let max_receive_count = self.redrive.as_ref().map(|r| r.max_receive_count);

        for (id, message) in state.messages.iter_mut() {
            if let Slot::InFlight { receipt, until } = &message.slot {
                if *until <= now {
                    expired_receipts.push(receipt.clone());
                    message.failed_deliveries += 1;
                    message.slot = Slot::Visible;
                    tracing::debug!(
                        queue = %self.name,
                        message_id = %id,
                        receive_count = message.receive_count,
                        "visibility timeout expired"
                    );
                }
            }
            if !matches!(message.slot, Slot::Visible) {
                continue;
            }
            if max_receive_count.is_some_and(|max| message.failed_deliveries > max) {
                to_remove.push((*id, true));
            } else if self
                .config
                .retention
                .is_some_and(|retention| message.sent_at + retention <= now)
            {
                to_remove.push((*id, false));
            }
        }

        for receipt in expired_receipts {
            state.in_flight.remove(&receipt);
        }

        let mut moved = Vec::new();
        for (id, redrive) in to_remove {
            let Some(message) = state.messages.remove(&id) else {
                continue;
            };
            if redrive {
                moved.push((id, message));
            } else {
                tracing::warn!(queue = %self.name, message_id = %id, "retention period elapsed, message discarded");
            }
        }
        if state.visible_len() == 0 {
            state.window_opened = None;
        }
        moved
    }

    fn poll_batch(&self, state: &mut State, now: Instant) -> Poll {
        let visible = state.visible_len();
        let expiry = state.next_expiry();
        if visible == 0 {
            return Poll::Wait(expiry);
        }

        let batch_size = self.config.batch_size.max(1);
        let window = self.config.max_batching_window;
        let opened = *state.window_opened.get_or_insert(now);
        let deadline = opened + window;
        if visible >= batch_size || now >= deadline {
            state.window_opened = None;
            return Poll::Ready(self.take(state, batch_size, now));
        }
        Poll::Wait(Some(expiry.map_or(deadline, |e| e.min(deadline))))
    }

    fn take(&self, state: &mut State, max: usize, now: Instant) -> Vec<Envelope> {
        let until = now + self.config.visibility_timeout;
        let mut batch = Vec::new();
        for (id, message) in state.messages.iter_mut() {
            if batch.len() >= max {
                break;
            }
            if !matches!(message.slot, Slot::Visible) {
                continue;
            }
            message.receive_count += 1;
            let receipt = ReceiptHandle(format!("{}:{}:{}", self.name, id.0, message.receive_count));
            message.slot = Slot::InFlight {
                receipt: receipt.clone(),
                until,
            };
            batch.push(Envelope {
                message_id: *id,
                receipt,
                body: message.body.clone(),
                delivery_count: message.receive_count,
                attributes: message.attributes.clone(),
            });
        }
        for envelope in &batch {
            state
                .in_flight
                .insert(envelope.receipt.clone(), envelope.message_id);
        }
        batch
    }

    fn forward(&self, moved: Vec<(MessageId, Stored)>) {
        let Some(redrive) = &self.redrive else {
            return;
        };
        for (id, message) in moved {
            tracing::warn!(
                queue = %self.name,
                dead_letter_queue = %redrive.dead_letter.name(),
                message_id = %id,
                receive_count = message.receive_count,
                "moving message to dead-letter queue"
            );
            let mut attributes = message.attributes;
            attributes.insert(DEAD_LETTER_SOURCE.to_string(), self.name.clone());
            attributes.insert(RECEIVE_COUNT.to_string(), message.receive_count.to_string());
            redrive
                .dead_letter
                .send_with_attributes(message.body, attributes);
        }
    }
}
