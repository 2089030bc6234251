//! Outcome mail.

use super::{MailSettings, OUTCOME_SUBJECT, create::validate_image_key};
use shoebox_core::{EventKind, Handler, HandlerError, IngestionEvent, Notifier, RecordChange};
use shoebox_std::wire::decode_object_key;
use std::sync::Arc;

/// Tells the album owner what happened to an image.
///
/// Subscribes to every kind. Uploads that will be rejected are skipped here;
/// the dead-letter path reports those. Description edits are reported from
/// the [`RecordChange`] the update path emits once the edit has landed, so
/// the previous description is known; `Modified` events from the topic are
/// not mailed a second time.
#[derive(Clone)]
pub struct NotifyHandler {
    notifier: Arc<dyn Notifier>,
    mail: MailSettings,
}

impl NotifyHandler {
    /// Creates the handler.
    pub fn new(notifier: Arc<dyn Notifier>, mail: MailSettings) -> Self {
        Self { notifier, mail }
    }

    /// Builds the message text for `event`, or `None` if nothing is worth
    /// reporting.
    fn describe(&self, event: &IngestionEvent) -> Result<Option<String>, HandlerError> {
        match event.kind {
            EventKind::Created => match validate_image_key(&event.source_key) {
                Ok(file_name) => Ok(Some(format!("Added {file_name} to the collection"))),
                Err(reason) => {
                    tracing::debug!(key = %event.source_key, %reason, "no outcome mail for rejected upload");
                    Ok(None)
                }
            },
            EventKind::Removed => {
                let file_name = decode_object_key(&event.source_key)?;
                Ok(Some(format!("{file_name} was deleted")))
            }
            EventKind::Modified => {
                tracing::trace!(key = %event.source_key, "edit mailed once the record changes");
                Ok(None)
            }
        }
    }

    async fn send(&self, key: &str, kind: EventKind, body: String) -> Result<(), HandlerError> {
        let notification = self.mail.compose(OUTCOME_SUBJECT, body);
        match self.notifier.send(notification).await {
            Ok(()) => {
                tracing::info!(%key, ?kind, "outcome mail sent");
                Ok(())
            }
            Err(error) if error.is_transient() => Err(error.into()),
            Err(error) => {
                tracing::error!(%key, %error, "outcome mail dropped");
                Ok(())
            }
        }
    }
}

impl Handler<IngestionEvent> for NotifyHandler {
    type Output = Result<(), HandlerError>;

    async fn call(&self, event: IngestionEvent) -> Self::Output {
        match self.describe(&event)? {
            Some(body) => self.send(&event.source_key, event.kind, body).await,
            None => Ok(()),
        }
    }
}

impl Handler<RecordChange> for NotifyHandler {
    type Output = Result<(), HandlerError>;

    async fn call(&self, change: RecordChange) -> Self::Output {
        let RecordChange {
            file_name,
            old_content,
            new_content,
        } = &change;
        let body = match old_content.as_deref() {
            Some(old) if !old.is_empty() => {
                format!("{file_name} description changed from {old} to {new_content}")
            }
            _ => format!("{file_name} description changed to {new_content}"),
        };
        self.send(file_name, EventKind::Modified, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoebox_std::testing::{FailingNotifier, RecordingNotifier};

    fn mail() -> MailSettings {
        MailSettings::new("album@example.com", "owner@example.com")
    }

    fn change(file_name: &str, old: Option<&str>, new: &str) -> RecordChange {
        RecordChange {
            file_name: file_name.into(),
            old_content: old.map(str::to_string),
            new_content: new.into(),
        }
    }

    #[tokio::test]
    async fn messages_per_kind() {
        let notifier = RecordingNotifier::new();
        let handler = NotifyHandler::new(Arc::new(notifier.clone()), mail());

        handler.call(IngestionEvent::created("vacation+photo.png")).await.unwrap();
        handler.call(change("img.jpg", None, "sunset")).await.unwrap();
        handler.call(change("cat.png", Some("grumpy"), "sleepy")).await.unwrap();
        handler.call(IngestionEvent::removed("img.jpg")).await.unwrap();

        let bodies: Vec<_> = notifier.sent().into_iter().map(|n| n.body).collect();
        assert_eq!(
            bodies,
            vec![
                "Added vacation photo.png to the collection",
                "img.jpg description changed to sunset",
                "cat.png description changed from grumpy to sleepy",
                "img.jpg was deleted",
            ]
        );

        let first = &notifier.sent()[0];
        assert_eq!(first.subject, OUTCOME_SUBJECT);
        assert_eq!(first.recipient, "owner@example.com");
        assert_eq!(first.sender, "The Photo Album <album@example.com>");
    }

    #[tokio::test]
    async fn rejected_uploads_and_topic_edits_are_silent() {
        let notifier = RecordingNotifier::new();
        let handler = NotifyHandler::new(Arc::new(notifier.clone()), mail());

        handler.call(IngestionEvent::created("doc.txt")).await.unwrap();
        handler.call(IngestionEvent::modified("img.jpg", "sunset")).await.unwrap();

        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn empty_previous_content_reads_as_none() {
        let notifier = RecordingNotifier::new();
        let handler = NotifyHandler::new(Arc::new(notifier.clone()), mail());

        handler.call(change("img.jpg", Some(""), "sunset")).await.unwrap();

        assert_eq!(notifier.sent()[0].body, "img.jpg description changed to sunset");
    }

    #[tokio::test]
    async fn transient_failure_is_returned() {
        let notifier = FailingNotifier::transient(1);
        let handler = NotifyHandler::new(Arc::new(notifier.clone()), mail());

        let err = handler.call(IngestionEvent::removed("a.png")).await.unwrap_err();
        assert!(matches!(err, HandlerError::Notify(_)));
        assert!(!err.is_permanent());

        handler.call(IngestionEvent::removed("a.png")).await.unwrap();
        assert_eq!(notifier.delivered().len(), 1);
    }

    #[tokio::test]
    async fn terminal_failure_is_dropped() {
        let notifier = FailingNotifier::rejecting();
        let handler = NotifyHandler::new(Arc::new(notifier.clone()), mail());

        handler.call(change("img.jpg", None, "sunset")).await.unwrap();
        assert_eq!(notifier.attempts(), 1);
        assert!(notifier.delivered().is_empty());
    }
}
