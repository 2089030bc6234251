//! Notifier that writes to the log.

use async_trait::async_trait;
use shoebox_core::{Notification, Notifier, NotifyError};

/// Emits each notification as an `info` event instead of sending mail.
///
/// Used by the standalone binary and anywhere no mail transport is wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        tracing::info!(
            to = %notification.recipient,
            from = %notification.sender,
            subject = %notification.subject,
            body = %notification.body,
            "notification"
        );
        Ok(())
    }
}
