//! Delivered messages.

use std::collections::BTreeMap;
use std::fmt;

/// Attribute naming the queue a dead-lettered message came from.
pub const DEAD_LETTER_SOURCE: &str = "dead_letter_source";
/// Attribute carrying how many times a dead-lettered message was delivered.
pub const RECEIVE_COUNT: &str = "receive_count";

/// Stable identity of a queued message across redeliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub(crate) u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// Opaque token naming one delivery of a message.
///
/// Each redelivery gets a new receipt; acknowledging with a stale one fails.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(pub(crate) String);

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One message as handed to a consumer.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Message identity.
    pub message_id: MessageId,
    /// Token for acknowledging this delivery.
    pub receipt: ReceiptHandle,
    /// Wire body.
    pub body: String,
    /// Deliveries so far, including this one.
    pub delivery_count: u32,
    /// Message attributes.
    pub attributes: BTreeMap<String, String>,
}

impl Envelope {
    /// Returns a message attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}
