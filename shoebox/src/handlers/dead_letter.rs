//! Rejection mail for dead-lettered uploads.

use super::{MailSettings, REJECTION_SUBJECT, create::validate_image_key};
use shoebox_core::{Handler, HandlerError, Notifier};
use shoebox_std::DeadLetter;
use std::{fmt::Write, sync::Arc};

/// Sends one rejection notification per dead-lettered message.
///
/// Never retries the original operation and never fails: a dead letter is
/// acknowledged whether or not the mail goes out, so the owner hears about
/// each rejection at most once.
pub struct DeadLetterHandler {
    notifier: Arc<dyn Notifier>,
    mail: MailSettings,
}

impl DeadLetterHandler {
    /// Creates the handler.
    pub fn new(notifier: Arc<dyn Notifier>, mail: MailSettings) -> Self {
        Self { notifier, mail }
    }
}

/// Summarizes a dead letter, one line per recovered event.
fn summarize(letter: &DeadLetter) -> String {
    let mut body = String::new();
    if letter.events.is_empty() {
        let _ = writeln!(body, "Message {} could not be read.", letter.message_id);
    }
    for event in &letter.events {
        let _ = match validate_image_key(&event.source_key) {
            Err(reason) => writeln!(body, "Rejected {}: {reason}", event.source_key),
            Ok(file_name) => writeln!(body, "Could not add {file_name} to the collection"),
        };
    }
    if let Some(count) = letter.receive_count {
        let _ = write!(body, "Delivery attempts: {count}");
    }
    if let Some(source) = &letter.source_queue {
        let _ = write!(body, " (from {source})");
    }
    body.trim_end().to_string()
}

impl Handler<DeadLetter> for DeadLetterHandler {
    type Output = Result<(), HandlerError>;

    async fn call(&self, letter: DeadLetter) -> Self::Output {
        let notification = self.mail.compose(REJECTION_SUBJECT, summarize(&letter));
        match self.notifier.send(notification).await {
            Ok(()) => tracing::info!(message_id = %letter.message_id, "rejection mail sent"),
            Err(error) => {
                tracing::error!(message_id = %letter.message_id, %error, "rejection mail dropped")
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoebox_core::IngestionEvent;
    use shoebox_std::{
        BatchQueue, DeadLetterDecoder, EnvelopeDecoder, QueueConfig,
        testing::{FailingNotifier, RecordingNotifier},
        wire,
    };
    use std::collections::BTreeMap;

    fn mail() -> MailSettings {
        MailSettings::new("album@example.com", "owner@example.com")
    }

    fn dead_letter_for(key: &str) -> DeadLetter {
        let dlq = BatchQueue::new("bad-images", QueueConfig::default());
        let body = wire::encode_queue_body(&IngestionEvent::created(key), "images", "m-1").unwrap();
        dlq.send_with_attributes(
            body,
            BTreeMap::from([
                ("dead_letter_source".to_string(), "img-created".to_string()),
                ("receive_count".to_string(), "2".to_string()),
            ]),
        );
        let envelope = dlq.receive(1).remove(0);
        DeadLetterDecoder.decode(&envelope).unwrap().remove(0)
    }

    #[tokio::test]
    async fn one_rejection_per_dead_letter() {
        let notifier = RecordingNotifier::new();
        let handler = DeadLetterHandler::new(Arc::new(notifier.clone()), mail());

        handler.call(dead_letter_for("doc.txt")).await.unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, REJECTION_SUBJECT);
        assert!(sent[0].body.contains("Rejected doc.txt: unsupported type"));
        assert!(sent[0].body.contains("Delivery attempts: 2 (from img-created)"));
    }

    #[tokio::test]
    async fn send_failure_still_succeeds() {
        let notifier = FailingNotifier::transient(1);
        let handler = DeadLetterHandler::new(Arc::new(notifier.clone()), mail());

        handler.call(dead_letter_for("doc.txt")).await.unwrap();

        assert_eq!(notifier.attempts(), 1);
    }

    #[test]
    fn unreadable_body_is_still_summarized() {
        let dlq = BatchQueue::new("bad-images", QueueConfig::default());
        dlq.send("garbage");
        let envelope = dlq.receive(1).remove(0);
        let letter = DeadLetterDecoder.decode(&envelope).unwrap().remove(0);

        assert_eq!(summarize(&letter), "Message msg-0 could not be read.");
    }
}
