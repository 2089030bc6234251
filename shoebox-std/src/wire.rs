//! Wire formats.
//!
//! Three payloads cross the pipeline boundary:
//!
//! - **Storage notifications** from the object store:
//!   `{"Records":[{"eventName":..,"s3":{"bucket":{"name":..},"object":{"key":..}}}]}`
//! - **Topic notifications**, the body of every queue message: a JSON object
//!   whose `Message` field is itself a JSON string holding a storage
//!   notification.
//! - **Update triggers**: `{"name":..,"description":..}`.
//!
//! Each is decoded exactly once, here, into [`IngestionEvent`]s; handlers
//! never see JSON.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use shoebox_core::{DecodeError, EventKind, IngestionEvent, ValidationError, attr};
use std::collections::BTreeMap;

/// Storage notification envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageNotification {
    /// One entry per object operation.
    #[serde(rename = "Records", default)]
    pub records: Vec<StorageRecord>,
}

/// One object operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRecord {
    /// E.g. `ObjectCreated:Put`.
    #[serde(rename = "eventName")]
    pub event_name: String,
    /// Bucket and object.
    pub s3: StorageEntity,
}

/// Bucket and object of a [`StorageRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntity {
    /// Bucket reference.
    pub bucket: BucketRef,
    /// Object reference.
    pub object: ObjectRef,
}

/// Bucket reference.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BucketRef {
    /// Bucket name.
    #[serde(default)]
    pub name: String,
}

/// Object reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Percent-encoded object key, `+` standing for space.
    pub key: String,
}

impl StorageRecord {
    /// Converts to an event, or `None` for event names the pipeline ignores.
    pub fn to_event(&self) -> Option<IngestionEvent> {
        let kind = EventKind::from_event_name(&self.event_name)?;
        Some(
            IngestionEvent::new(kind, self.s3.object.key.clone())
                .with_attribute(attr::BUCKET, self.s3.bucket.name.clone())
                .with_attribute(attr::EVENT_NAME, self.event_name.clone()),
        )
    }

    /// Builds the wire record for an event.
    pub fn from_event(event: &IngestionEvent) -> Self {
        Self {
            event_name: event.event_name().to_string(),
            s3: StorageEntity {
                bucket: BucketRef {
                    name: event.attribute(attr::BUCKET).unwrap_or_default().to_string(),
                },
                object: ObjectRef {
                    key: event.source_key.clone(),
                },
            },
        }
    }
}

/// Topic notification as seen by queue subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TopicNotification {
    /// Always `Notification`.
    #[serde(rename = "Type")]
    pub kind: String,
    /// Publisher-assigned id.
    pub message_id: String,
    /// Topic the message was published on.
    pub topic_arn: String,
    /// JSON-encoded storage notification.
    pub message: String,
    /// Message attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub message_attributes: BTreeMap<String, MessageAttribute>,
}

/// A typed topic message attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageAttribute {
    /// Attribute type, e.g. `String`.
    #[serde(rename = "Type")]
    pub data_type: String,
    /// Attribute value.
    pub value: String,
}

/// Out-of-band description edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTrigger {
    /// Record name.
    pub name: String,
    /// New description.
    pub description: String,
}

impl From<UpdateTrigger> for IngestionEvent {
    fn from(trigger: UpdateTrigger) -> Self {
        IngestionEvent::modified(trigger.name, trigger.description)
    }
}

/// Decodes a storage notification, skipping records of other event types.
pub fn decode_storage_notification(json: &str) -> Result<Vec<IngestionEvent>, DecodeError> {
    let notification: StorageNotification =
        serde_json::from_str(json).map_err(|e| DecodeError::json("storage notification", e))?;
    Ok(notification
        .records
        .iter()
        .filter_map(|record| {
            let event = record.to_event();
            if event.is_none() {
                tracing::debug!(event_name = %record.event_name, "ignoring storage event");
            }
            event
        })
        .collect())
}

/// Decodes the outer topic notification of a queue message.
pub fn decode_topic_notification(json: &str) -> Result<TopicNotification, DecodeError> {
    serde_json::from_str(json).map_err(|e| DecodeError::json("topic notification", e))
}

/// Decodes a queue message body (topic notification wrapping a storage
/// notification) into events.
pub fn decode_queue_body(body: &str) -> Result<Vec<IngestionEvent>, DecodeError> {
    let notification = decode_topic_notification(body)?;
    let events = decode_storage_notification(&notification.message)?;
    if events.is_empty() {
        return Err(DecodeError::Empty("queue message"));
    }
    Ok(events)
}

/// Decodes an update trigger into a `Modified` event.
pub fn decode_update_trigger(json: &str) -> Result<IngestionEvent, DecodeError> {
    let trigger: UpdateTrigger =
        serde_json::from_str(json).map_err(|e| DecodeError::json("update trigger", e))?;
    Ok(trigger.into())
}

/// Encodes events as a storage notification.
pub fn encode_storage_notification(events: &[IngestionEvent]) -> Result<String, serde_json::Error> {
    serde_json::to_string(&StorageNotification {
        records: events.iter().map(StorageRecord::from_event).collect(),
    })
}

/// Encodes one event as a queue message body published on `topic`.
pub fn encode_queue_body(
    event: &IngestionEvent,
    topic: &str,
    message_id: &str,
) -> Result<String, serde_json::Error> {
    let message = encode_storage_notification(std::slice::from_ref(event))?;
    serde_json::to_string(&TopicNotification {
        kind: "Notification".to_string(),
        message_id: message_id.to_string(),
        topic_arn: topic.to_string(),
        message,
        message_attributes: BTreeMap::new(),
    })
}

/// Decodes a raw object key: `+` becomes a space, then percent-escapes are
/// resolved.
pub fn decode_object_key(raw: &str) -> Result<String, ValidationError> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ValidationError::MalformedKey {
            key: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORAGE: &str = r#"{
        "Records": [
            {
                "eventVersion": "2.1",
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": { "name": "images" },
                    "object": { "key": "vacation+photo.png", "size": 1024 }
                }
            },
            {
                "eventName": "ObjectRestore:Completed",
                "s3": { "bucket": { "name": "images" }, "object": { "key": "old.png" } }
            }
        ]
    }"#;

    #[test]
    fn storage_notification_decodes_known_kinds_only() {
        let events = decode_storage_notification(STORAGE).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Created);
        assert_eq!(events[0].source_key, "vacation+photo.png");
        assert_eq!(events[0].attribute(attr::BUCKET), Some("images"));
        assert_eq!(events[0].attribute(attr::EVENT_NAME), Some("ObjectCreated:Put"));
    }

    #[test]
    fn queue_body_is_double_encoded() {
        let event = IngestionEvent::created("a%2Bb.png").with_attribute(attr::BUCKET, "images");
        let body = encode_queue_body(&event, "images-topic", "m-1").unwrap();

        let outer: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(outer["Type"], "Notification");
        assert!(outer["Message"].is_string());

        let decoded = decode_queue_body(&body).unwrap();
        assert_eq!(decoded[0].source_key, "a%2Bb.png");
        assert_eq!(decoded[0].kind, EventKind::Created);
    }

    #[test]
    fn queue_body_from_external_publisher() {
        let body = serde_json::json!({
            "Type": "Notification",
            "MessageId": "0c1d",
            "TopicArn": "arn:images",
            "Message": STORAGE,
        })
        .to_string();
        let events = decode_queue_body(&body).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        assert!(matches!(
            decode_queue_body("not json"),
            Err(DecodeError::Json { layer: "topic notification", .. })
        ));
        let body = serde_json::json!({
            "Type": "Notification",
            "MessageId": "0c1d",
            "TopicArn": "arn:images",
            "Message": "{\"Records\":[]}",
        })
        .to_string();
        assert!(matches!(decode_queue_body(&body), Err(DecodeError::Empty(_))));
    }

    #[test]
    fn update_trigger_becomes_modified_event() {
        let event = decode_update_trigger(r#"{"name":"img.jpg","description":"sunset"}"#).unwrap();
        assert_eq!(event, IngestionEvent::modified("img.jpg", "sunset"));
        assert!(decode_update_trigger(r#"{"name":"img.jpg"}"#).is_err());
    }

    #[test]
    fn object_keys_decode_plus_and_escapes() {
        assert_eq!(decode_object_key("vacation+photo.png").unwrap(), "vacation photo.png");
        assert_eq!(decode_object_key("caf%C3%A9.jpeg").unwrap(), "café.jpeg");
        assert_eq!(decode_object_key("a%2Bb.png").unwrap(), "a+b.png");
        assert!(matches!(
            decode_object_key("bad%FF.png"),
            Err(ValidationError::MalformedKey { .. })
        ));
    }
}
