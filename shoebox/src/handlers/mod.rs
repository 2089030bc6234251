//! The five album handlers.
//!
//! Record handlers ([`CreateHandler`], [`DeleteHandler`], [`UpdateHandler`])
//! mutate one key each and are safe to run twice. Mail handlers
//! ([`NotifyHandler`], [`DeadLetterHandler`]) build a [`Notification`] and
//! decide per call site what a send failure means.
//!
//! Every handler returns `Result<(), HandlerError>` so it can sit behind a
//! [`Dispatcher`](shoebox_std::Dispatcher) or a direct subscription alike.

pub mod create;
pub mod dead_letter;
pub mod delete;
pub mod notify;
pub mod update;

pub use create::{CreateHandler, SUPPORTED_EXTENSIONS, validate_image_key};
pub use dead_letter::DeadLetterHandler;
pub use delete::DeleteHandler;
pub use notify::NotifyHandler;
pub use update::UpdateHandler;

use shoebox_core::{EventKind, IngestionEvent, Notification, ValidationError};

/// Display name used as the sender of every notification.
pub const SENDER_NAME: &str = "The Photo Album";

/// Subject of outcome notifications.
pub const OUTCOME_SUBJECT: &str = "New image upload";

/// Subject of rejection notifications.
pub const REJECTION_SUBJECT: &str = "Image rejected";

/// Sender and recipient of album notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
}

impl MailSettings {
    /// Creates settings for `from` and `to`.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub(crate) fn compose(&self, subject: &str, body: String) -> Notification {
        Notification {
            recipient: self.to.clone(),
            sender: format!("{SENDER_NAME} <{}>", self.from),
            subject: subject.to_string(),
            body,
        }
    }
}

fn expect_kind(event: &IngestionEvent, kind: EventKind) -> Result<(), ValidationError> {
    if event.kind == kind {
        Ok(())
    } else {
        Err(ValidationError::UnexpectedKind(event.kind))
    }
}
