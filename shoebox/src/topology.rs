//! The album pipeline, wired end to end.
//!
//! ```text
//! ingress ─► Topic "images"
//!              ├─ create  [Created]            ─► BatchQueue ─► Dispatcher ─► CreateHandler
//!              │                                      └─ redrive ─► dead letters ─► Dispatcher ─► DeadLetterHandler
//!              ├─ delete  [Removed]            ─► DeleteHandler
//!              ├─ update  [Modified, has name] ─► UpdateHandler ─► RecordChange ─► NotifyHandler
//!              └─ mailer  [any]                ─► NotifyHandler
//! ```
//!
//! Direct subscriptions, and the change hook behind `update`, run as
//! `TracingHook(RetryHook(TimeoutHook(filter.handler(handler))))`.

use crate::{
    config::Config,
    handlers::{CreateHandler, DeadLetterHandler, DeleteHandler, NotifyHandler, UpdateHandler},
};
use futures::FutureExt;
use shoebox_core::{
    DecodeError, EventKind, Handler, Hook, IngestionEvent, IntoResponse, Listener, Message,
    Notifier, RecordChange, RecordStore, Routable, RouteResult, RoutingError, attr,
};
use shoebox_std::{
    BatchQueue, DeadLetterDecoder, Dispatcher, QueueConfig, QueueSink, RedrivePolicy, RetryHook,
    SubscriptionFilter, TimeoutHook, Topic, TopicEnvelopeDecoder, TracingHook, wire,
};
use std::{future::Future, sync::Arc, time::Duration};

/// Name of the topic every event is published on.
pub const TOPIC_NAME: &str = "images";
/// Name of the create queue.
pub const CREATE_QUEUE: &str = "img-created";
/// Name of the dead-letter queue.
pub const DEAD_LETTER_QUEUE: &str = "bad-images";

/// Topic, queues and dispatchers of one pipeline process.
pub struct Topology {
    topic: Topic<IngestionEvent>,
    create_queue: Arc<BatchQueue>,
    dead_letter_queue: Arc<BatchQueue>,
    create: Dispatcher<TopicEnvelopeDecoder, CreateHandler>,
    dead_letters: Dispatcher<DeadLetterDecoder, DeadLetterHandler>,
}

fn direct<E, H>(
    name: &str,
    filter: SubscriptionFilter,
    handler: H,
    timeout: Duration,
    attempts: u32,
) -> impl Hook<E>
where
    E: Message + Routable + Clone + Sync,
    H: Handler<E>,
    H::Output: IntoResponse,
{
    let pipeline = Listener::<E>::handler(filter, handler);
    TracingHook::new(RetryHook::new(TimeoutHook::new(pipeline, timeout), attempts), name)
}

impl Topology {
    /// Builds every component from `config`, sharing `store` and `notifier`.
    pub fn build(
        config: &Config,
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, RoutingError> {
        let dead_letter_queue = Arc::new(BatchQueue::new(
            DEAD_LETTER_QUEUE,
            QueueConfig::default().with_retention(config.dead_letter_retention),
        ));
        let create_queue = Arc::new(BatchQueue::with_redrive(
            CREATE_QUEUE,
            QueueConfig::default()
                .with_batch_size(config.batch_size)
                .with_batching_window(config.batch_window)
                .with_visibility_timeout(config.visibility_timeout),
            RedrivePolicy {
                dead_letter: dead_letter_queue.clone(),
                max_receive_count: config.max_receive_count,
            },
        ));

        let mailer = NotifyHandler::new(notifier.clone(), config.mail.clone());
        let changes = direct::<RecordChange, _>(
            "changes",
            SubscriptionFilter::any(),
            mailer.clone(),
            config.notify_timeout,
            config.direct_attempts,
        );

        let created = SubscriptionFilter::kind(EventKind::Created);
        let topic = Topic::builder(TOPIC_NAME)
            .subscribe(
                "create",
                TracingHook::new(
                    Listener::<IngestionEvent>::handler(
                        created,
                        QueueSink::new(TOPIC_NAME, create_queue.clone()),
                    ),
                    "create",
                ),
            )?
            .subscribe(
                "delete",
                direct::<IngestionEvent, _>(
                    "delete",
                    SubscriptionFilter::kind(EventKind::Removed),
                    DeleteHandler::new(store.clone()),
                    config.handler_timeout,
                    config.direct_attempts,
                ),
            )?
            .subscribe(
                "update",
                direct::<IngestionEvent, _>(
                    "update",
                    SubscriptionFilter::kind(EventKind::Modified).attribute_exists(attr::NAME),
                    UpdateHandler::new(store.clone()).with_changes(changes),
                    config.handler_timeout,
                    config.direct_attempts,
                ),
            )?
            .subscribe(
                "mailer",
                direct::<IngestionEvent, _>(
                    "mailer",
                    SubscriptionFilter::any(),
                    mailer,
                    config.notify_timeout,
                    config.direct_attempts,
                ),
            )?
            .build();

        let create = Dispatcher::new(
            create_queue.clone(),
            TopicEnvelopeDecoder,
            CreateHandler::new(store),
        )
        .with_budget(config.handler_timeout)
        .with_policy(config.failure_policy);
        let dead_letters = Dispatcher::new(
            dead_letter_queue.clone(),
            DeadLetterDecoder,
            DeadLetterHandler::new(notifier, config.mail.clone()),
        )
        .with_budget(config.notify_timeout);

        tracing::info!(
            topic = TOPIC_NAME,
            subscriptions = topic.subscriptions().len(),
            table = %config.table_name,
            region = %config.region,
            "topology built"
        );

        Ok(Self {
            topic,
            create_queue,
            dead_letter_queue,
            create,
            dead_letters,
        })
    }

    /// The fan-out topic.
    pub fn topic(&self) -> &Topic<IngestionEvent> {
        &self.topic
    }

    /// Queue feeding [`CreateHandler`].
    pub fn create_queue(&self) -> &Arc<BatchQueue> {
        &self.create_queue
    }

    /// Queue feeding [`DeadLetterHandler`].
    pub fn dead_letter_queue(&self) -> &Arc<BatchQueue> {
        &self.dead_letter_queue
    }

    /// Publishes one event.
    pub async fn publish(&self, event: &IngestionEvent) -> RouteResult {
        self.topic.publish(event).await
    }

    /// Publishes every event of a storage notification.
    pub async fn ingest_storage_notification(&self, json: &str) -> Result<RouteResult, DecodeError> {
        let mut result = RouteResult::default();
        for event in wire::decode_storage_notification(json)? {
            result += self.publish(&event).await;
        }
        Ok(result)
    }

    /// Publishes an update trigger.
    pub async fn ingest_update(&self, json: &str) -> Result<RouteResult, DecodeError> {
        let event = wire::decode_update_trigger(json)?;
        Ok(self.publish(&event).await)
    }

    /// Publishes one ingress payload, telling storage notifications (a
    /// `Records` array) from update triggers.
    pub async fn ingest(&self, json: &str) -> Result<RouteResult, DecodeError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| DecodeError::json("ingress", e))?;
        if value.get("Records").is_some() {
            self.ingest_storage_notification(json).await
        } else {
            self.ingest_update(json).await
        }
    }

    /// Runs both dispatchers until `shutdown` completes.
    pub async fn run<S>(&self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        let shutdown = shutdown.shared();
        tokio::join!(
            self.create.run(shutdown.clone()),
            self.dead_letters.run(shutdown),
        );
    }

    /// Waits until both queues are empty, polling every `interval`.
    pub async fn drained(&self, interval: Duration) {
        while !(self.create_queue.is_empty() && self.dead_letter_queue.is_empty()) {
            tokio::time::sleep(interval).await;
        }
    }
}
