//! Outbound notifications.

use crate::error::NotifyError;
use async_trait::async_trait;

/// A message for the album owner. Built by handlers, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Destination address.
    pub recipient: String,
    /// Source address.
    pub sender: String,
    /// Subject line.
    pub subject: String,
    /// Message text; rendering to HTML is the transport's concern.
    pub body: String,
}

/// External send capability.
///
/// Implementations own rendering and transport. The pipeline decides per call
/// site what a failure means, using [`NotifyError::is_transient`].
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Sends one notification.
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}
