//! Queue consumer.
//!
//! A [`Dispatcher`] pulls batches from one [`BatchQueue`], decodes every
//! envelope once, invokes its handler item by item, and acknowledges each
//! envelope on its own. A failed envelope is left unacknowledged so the
//! queue's visibility timeout and redrive policy decide what happens next;
//! nothing that happens to one envelope affects the others in its batch.

use super::decoder::EnvelopeDecoder;
use crate::queue::{BatchQueue, Envelope, MessageId};
use shoebox_core::{Handler, HandlerError};
use std::{future::Future, str::FromStr, sync::Arc, time::Duration};
use tokio::time::{Instant, timeout_at};
use tracing::Instrument;

/// How failures are reported back to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Every failure waits for redelivery; the redrive threshold alone decides
    /// when a message is dead-lettered.
    #[default]
    Uniform,
    /// Permanent failures (validation, undecodable bodies) go to the
    /// dead-letter queue after one attempt.
    DeadLetterPermanent,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(FailurePolicy::Uniform),
            "dead-letter-permanent" => Ok(FailurePolicy::DeadLetterPermanent),
            other => Err(format!(
                "unknown failure policy `{other}` (expected `uniform` or `dead-letter-permanent`)"
            )),
        }
    }
}

/// One envelope that was not acknowledged.
#[derive(Debug)]
pub struct ItemFailure {
    /// The failed message.
    pub message_id: MessageId,
    /// Why it failed.
    pub error: HandlerError,
    /// Whether it was sent straight to the dead-letter queue.
    pub dead_lettered: bool,
}

/// Per-envelope outcome of one batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Envelopes handled and acknowledged.
    pub acknowledged: Vec<MessageId>,
    /// Envelopes left for redelivery or dead-lettered.
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    /// Returns `true` if every envelope was acknowledged.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runtime entry point for a queue-fed handler.
pub struct Dispatcher<D, H> {
    queue: Arc<BatchQueue>,
    decoder: D,
    handler: H,
    budget: Duration,
    policy: FailurePolicy,
}

impl<D, H> Dispatcher<D, H>
where
    D: EnvelopeDecoder,
    H: Handler<D::Item, Output = Result<(), HandlerError>>,
{
    /// Creates a dispatcher with a 15 second budget per batch.
    pub fn new(queue: Arc<BatchQueue>, decoder: D, handler: H) -> Self {
        Self {
            queue,
            decoder,
            handler,
            budget: Duration::from_secs(15),
            policy: FailurePolicy::default(),
        }
    }

    /// Sets the wall-clock budget of one batch invocation.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Sets the failure policy.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The queue this dispatcher drains.
    pub fn queue(&self) -> &Arc<BatchQueue> {
        &self.queue
    }

    /// The wrapped handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Handles one batch, sequentially, within the budget.
    ///
    /// Envelopes still pending when the budget runs out fail with
    /// [`HandlerError::Timeout`]; dropping the in-flight handler future
    /// cancels its outstanding I/O.
    pub async fn process_batch(&self, batch: Vec<Envelope>) -> BatchReport {
        let span = tracing::info_span!("dispatch", queue = %self.queue.name(), size = batch.len());
        async move {
            let deadline = Instant::now() + self.budget;
            let mut report = BatchReport::default();

            for envelope in batch {
                match self.process_envelope(&envelope, deadline).await {
                    Ok(()) => {
                        if let Err(error) = self.queue.ack(&envelope.receipt) {
                            tracing::warn!(message_id = %envelope.message_id, %error, "acknowledgment failed, message may be redelivered");
                        }
                        report.acknowledged.push(envelope.message_id);
                    }
                    Err(error) => report.failures.push(self.fail(&envelope, error)),
                }
            }

            tracing::debug!(
                acknowledged = report.acknowledged.len(),
                failed = report.failures.len(),
                "batch processed"
            );
            report
        }
        .instrument(span)
        .await
    }

    /// Consumes batches until `shutdown` completes.
    pub async fn run<S>(&self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        let mut shutdown = std::pin::pin!(shutdown);
        tracing::info!(queue = %self.queue.name(), "dispatcher started");
        loop {
            let batch = tokio::select! {
                _ = &mut shutdown => break,
                batch = self.queue.next_batch() => batch,
            };
            self.process_batch(batch).await;
        }
        tracing::info!(queue = %self.queue.name(), "dispatcher stopped");
    }

    async fn process_envelope(
        &self,
        envelope: &Envelope,
        deadline: Instant,
    ) -> Result<(), HandlerError> {
        let items = self.decoder.decode(envelope)?;
        for item in items {
            match timeout_at(deadline, self.handler.call(item)).await {
                Ok(result) => result?,
                Err(_) => return Err(HandlerError::Timeout(self.budget)),
            }
        }
        Ok(())
    }

    fn fail(&self, envelope: &Envelope, error: HandlerError) -> ItemFailure {
        let permanent = error.is_permanent();
        let mut dead_lettered = false;

        if permanent
            && self.policy == FailurePolicy::DeadLetterPermanent
            && self.queue.redrive().is_some()
        {
            match self.queue.dead_letter(&envelope.receipt) {
                Ok(()) => dead_lettered = true,
                Err(queue_error) => {
                    tracing::warn!(message_id = %envelope.message_id, error = %queue_error, "could not dead-letter message");
                }
            }
        }

        tracing::warn!(
            message_id = %envelope.message_id,
            delivery_count = envelope.delivery_count,
            permanent,
            dead_lettered,
            %error,
            "item failed"
        );

        ItemFailure {
            message_id: envelope.message_id,
            error,
            dead_lettered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dispatch::decoder::TopicEnvelopeDecoder,
        queue::{QueueConfig, QueueSink, RedrivePolicy},
    };
    use shoebox_core::{IngestionEvent, StoreError, ValidationError};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct FailOn {
        keys: Vec<&'static str>,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Handler<IngestionEvent> for FailOn {
        type Output = Result<(), HandlerError>;

        async fn call(&self, event: IngestionEvent) -> Self::Output {
            self.seen.lock().unwrap().push(event.source_key.clone());
            if self.keys.contains(&event.source_key.as_str()) {
                return Err(StoreError::Unavailable("connection reset".into()).into());
            }
            Ok(())
        }
    }

    async fn enqueue(queue: &Arc<BatchQueue>, keys: &[&str]) {
        let sink = QueueSink::new("images", queue.clone());
        for key in keys {
            sink.call(IngestionEvent::created(*key)).await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn partial_batch_success_acknowledges_the_rest() {
        let queue = Arc::new(BatchQueue::new("img-created", QueueConfig::default().with_batch_size(5)));
        enqueue(&queue, &["a.png", "b.png", "bad.png", "c.png", "d.png"]).await;

        let handler = FailOn {
            keys: vec!["bad.png"],
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(queue.clone(), TopicEnvelopeDecoder, handler.clone());

        let batch = queue.next_batch().await;
        assert_eq!(batch.len(), 5);
        let report = dispatcher.process_batch(batch).await;

        assert_eq!(report.acknowledged.len(), 4);
        assert_eq!(report.failures.len(), 1);
        assert!(!report.failures[0].dead_lettered);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.in_flight_len(), 1);
        assert_eq!(handler.seen.lock().unwrap().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn undecodable_body_fails_permanently() {
        let dlq = Arc::new(BatchQueue::new("bad-images", QueueConfig::default()));
        let queue = Arc::new(BatchQueue::with_redrive(
            "img-created",
            QueueConfig::default(),
            RedrivePolicy {
                dead_letter: dlq.clone(),
                max_receive_count: 3,
            },
        ));
        queue.send("{not json");

        let dispatcher = Dispatcher::new(queue.clone(), TopicEnvelopeDecoder, FailOn::default())
            .with_policy(FailurePolicy::DeadLetterPermanent);
        let report = dispatcher.process_batch(queue.receive(10)).await;

        assert!(report.failures[0].error.is_permanent());
        assert!(report.failures[0].dead_lettered);
        assert!(queue.is_empty());
        assert_eq!(dlq.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn uniform_policy_never_short_circuits() {
        let dlq = Arc::new(BatchQueue::new("bad-images", QueueConfig::default()));
        let queue = Arc::new(BatchQueue::with_redrive(
            "img-created",
            QueueConfig::default(),
            RedrivePolicy {
                dead_letter: dlq.clone(),
                max_receive_count: 1,
            },
        ));
        enqueue(&queue, &["doc.txt"]).await;

        let dispatcher = Dispatcher::new(
            queue.clone(),
            TopicEnvelopeDecoder,
            |_event: IngestionEvent| async {
                Err::<(), HandlerError>(
                    ValidationError::UnsupportedType {
                        key: "doc.txt".into(),
                        extension: "txt".into(),
                    }
                    .into(),
                )
            },
        );
        let report = dispatcher.process_batch(queue.receive(10)).await;
        assert!(!report.failures[0].dead_lettered);
        assert_eq!(queue.len(), 1);
        assert!(dlq.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_fails_remaining_items() {
        let queue = Arc::new(BatchQueue::new("img-created", QueueConfig::default()));
        enqueue(&queue, &["slow.png", "next.png"]).await;

        let dispatcher = Dispatcher::new(
            queue.clone(),
            TopicEnvelopeDecoder,
            |_event: IngestionEvent| async {
                tokio::time::sleep(Duration::from_secs(20)).await;
                Ok::<(), HandlerError>(())
            },
        )
        .with_budget(Duration::from_secs(15));

        let report = dispatcher.process_batch(queue.receive(10)).await;
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(report.failures[0].error, HandlerError::Timeout(_)));
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_shutdown() {
        let queue = Arc::new(BatchQueue::new("img-created", QueueConfig::default()));
        enqueue(&queue, &["a.png"]).await;
        let handler = FailOn::default();
        let dispatcher = Dispatcher::new(queue.clone(), TopicEnvelopeDecoder, handler.clone());

        dispatcher
            .run(tokio::time::sleep(Duration::from_secs(1)))
            .await;

        assert!(queue.is_empty());
        assert_eq!(*handler.seen.lock().unwrap(), vec!["a.png".to_string()]);
    }

    #[test]
    fn failure_policy_parses() {
        assert_eq!("uniform".parse(), Ok(FailurePolicy::Uniform));
        assert_eq!(
            "Dead-Letter-Permanent".parse(),
            Ok(FailurePolicy::DeadLetterPermanent)
        );
        assert!("retry".parse::<FailurePolicy>().is_err());
    }
}
