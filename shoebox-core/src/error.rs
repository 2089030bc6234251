//! Error types for Shoebox.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`ShoeboxError`] - Top-level error type
//! - [`HandlerError`] - Per-item handler outcome, classified permanent or transient
//! - [`ValidationError`] - Malformed or unsupported input
//! - [`StoreError`] / [`NotifyError`] - Failures of the external services
//! - [`DecodeError`] - Wire envelopes that cannot be turned into events
//! - [`QueueError`] / [`RoutingError`] - Plumbing failures
//! - [`ConfigError`] - Fatal startup errors

use std::time::Duration;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all Shoebox operations.
#[derive(Error, Debug)]
pub enum ShoeboxError {
    /// A handler failed.
    #[error("handler error: {0}")]
    Handler(#[from] HandlerError),

    /// An envelope could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A queue operation failed.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Routing failed.
    #[error("routing error: {0}")]
    Routing(#[from] RoutingError),

    /// Configuration was missing or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A custom error occurred.
    #[error(transparent)]
    Custom(BoxError),
}

/// Input that can never be processed, no matter how often it is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The object key has no extension.
    #[error("undetermined type: `{key}` has no file extension")]
    UndeterminedType {
        /// Decoded object key.
        key: String,
    },

    /// The extension is not one of the accepted image types.
    #[error("unsupported type: `{extension}` ({key})")]
    UnsupportedType {
        /// Decoded object key.
        key: String,
        /// Lower-cased extension.
        extension: String,
    },

    /// The key is not valid percent-encoded UTF-8.
    #[error("malformed key: `{key}`")]
    MalformedKey {
        /// Raw object key.
        key: String,
    },

    /// A required attribute is missing from the event.
    #[error("missing attribute `{0}`")]
    MissingAttribute(&'static str),

    /// The event kind does not belong to this handler.
    #[error("unexpected event kind {0:?}")]
    UnexpectedKind(crate::event::EventKind),
}

/// Failures reported by a [`RecordStore`](crate::RecordStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing table could not be reached.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// The backing table refused the request due to load.
    #[error("record store throttled the request")]
    Throttled,

    /// Backend-specific failure.
    #[error(transparent)]
    Backend(BoxError),
}

/// Failures reported by a [`Notifier`](crate::Notifier).
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The transport could not deliver right now; a later attempt may succeed.
    #[error("notifier transport failed: {0}")]
    Transport(String),

    /// The notification was refused (bad address, unverified sender, ...).
    #[error("notification rejected: {0}")]
    Rejected(String),
}

impl NotifyError {
    /// Returns `true` if retrying the send may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, NotifyError::Transport(_))
    }
}

/// Errors turning a wire payload into typed events.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The payload is not the expected JSON shape.
    #[error("invalid {layer} payload: {source}")]
    Json {
        /// Which envelope layer failed.
        layer: &'static str,
        /// Underlying parser error.
        #[source]
        source: BoxError,
    },

    /// The payload decoded but carried no usable events.
    #[error("{0} payload carries no events")]
    Empty(&'static str),
}

impl DecodeError {
    /// Wraps a parser error for the named envelope layer.
    pub fn json(layer: &'static str, source: impl Into<BoxError>) -> Self {
        DecodeError::Json {
            layer,
            source: source.into(),
        }
    }
}

/// Errors raised by queue operations.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The receipt does not name an in-flight message (expired or already acknowledged).
    #[error("unknown or expired receipt: {0}")]
    UnknownReceipt(String),

    /// The queue has no dead-letter target configured.
    #[error("queue `{0}` has no dead-letter queue")]
    NoDeadLetterQueue(String),

    /// A message could not be encoded for the queue.
    #[error("failed to encode message: {0}")]
    Encode(#[source] BoxError),
}

/// Errors that can occur while routing an event.
#[derive(Error, Debug)]
pub enum RoutingError {
    /// A subscriber failed.
    #[error("subscriber `{name}` failed")]
    Subscriber {
        /// Subscription name.
        name: String,
        /// Underlying error.
        #[source]
        source: BoxError,
    },

    /// A subscription with the same name already exists.
    #[error("subscription already exists: {0}")]
    AlreadyExists(String),
}

/// Per-item outcome of a handler invocation.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Input rejected; retrying cannot help.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The envelope could not be decoded; retrying cannot help.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The record store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The notifier failed.
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// The invocation exceeded its wall-clock budget.
    #[error("handler exceeded its {0:?} budget")]
    Timeout(Duration),
}

impl HandlerError {
    /// Returns `true` for failures that will fail again on every redelivery.
    pub fn is_permanent(&self) -> bool {
        match self {
            HandlerError::Validation(_) | HandlerError::Decode(_) => true,
            HandlerError::Notify(e) => !e.is_transient(),
            HandlerError::Store(_) | HandlerError::Timeout(_) => false,
        }
    }
}

/// Missing or invalid configuration; the process must refuse to start.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is absent or empty.
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    /// A variable is present but cannot be parsed.
    #[error("invalid value for `{key}`: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

impl From<BoxError> for ShoeboxError {
    fn from(err: BoxError) -> Self {
        ShoeboxError::Custom(err)
    }
}
