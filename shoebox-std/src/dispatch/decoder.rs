//! Envelope decoders.

use crate::{
    queue::{DEAD_LETTER_SOURCE, Envelope, MessageId, RECEIVE_COUNT},
    wire,
};
use shoebox_core::{DecodeError, IngestionEvent, Message};

/// Turns one queue envelope into the items a handler consumes.
pub trait EnvelopeDecoder: Send + Sync + 'static {
    /// What the handler receives.
    type Item: Message;

    /// Decodes the envelope.
    fn decode(&self, envelope: &Envelope) -> Result<Vec<Self::Item>, DecodeError>;
}

/// Decodes topic notifications wrapping storage notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopicEnvelopeDecoder;

impl EnvelopeDecoder for TopicEnvelopeDecoder {
    type Item = IngestionEvent;

    fn decode(&self, envelope: &Envelope) -> Result<Vec<IngestionEvent>, DecodeError> {
        wire::decode_queue_body(&envelope.body)
    }
}

/// A message that ended up on a dead-letter queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    /// Id on the dead-letter queue.
    pub message_id: MessageId,
    /// Queue the message was moved from.
    pub source_queue: Option<String>,
    /// Deliveries on the source queue before it was moved.
    pub receive_count: Option<u32>,
    /// Events recovered from the body; empty if the body was unreadable.
    pub events: Vec<IngestionEvent>,
    /// The body as received.
    pub raw_body: String,
}

/// Decodes dead-letter envelopes; never fails, so every dead letter is seen
/// exactly once by its handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadLetterDecoder;

impl EnvelopeDecoder for DeadLetterDecoder {
    type Item = DeadLetter;

    fn decode(&self, envelope: &Envelope) -> Result<Vec<DeadLetter>, DecodeError> {
        let events = match wire::decode_queue_body(&envelope.body) {
            Ok(events) => events,
            Err(error) => {
                tracing::warn!(message_id = %envelope.message_id, %error, "dead letter body unreadable");
                Vec::new()
            }
        };
        Ok(vec![DeadLetter {
            message_id: envelope.message_id,
            source_queue: envelope.attribute(DEAD_LETTER_SOURCE).map(str::to_string),
            receive_count: envelope
                .attribute(RECEIVE_COUNT)
                .and_then(|count| count.parse().ok()),
            events,
            raw_body: envelope.body.clone(),
        }])
    }
}
