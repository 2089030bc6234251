//! # shoebox
//!
//! Keeps a photo album table in step with the storage bucket holding the
//! images, and tells the album owner what changed.
//!
//! Object lifecycle events and description edits are published on a
//! [`Topic`]; filtered subscriptions fan each event out to the record
//! handlers and the mailer. Uploads pass through a [`BatchQueue`] so a bad
//! upload is retried and then dead-lettered on its own, producing one
//! rejection mail.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shoebox::{Config, InMemoryRecordStore, LogNotifier, Topology};
//! use std::sync::Arc;
//!
//! let config = Config::from_env()?;
//! let store = Arc::new(InMemoryRecordStore::new(&config.table_name));
//! let topology = Topology::build(&config, store, Arc::new(LogNotifier))?;
//!
//! topology
//!     .ingest(r#"{"Records":[{"eventName":"ObjectCreated:Put","s3":{"bucket":{"name":"images"},"object":{"key":"beach.png"}}}]}"#)
//!     .await?;
//! topology.run(tokio::signal::ctrl_c().map(drop)).await;
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod config;
pub mod handlers;
pub mod topology;

pub use config::Config;
pub use handlers::{
    CreateHandler, DeadLetterHandler, DeleteHandler, MailSettings, NotifyHandler, UpdateHandler,
};
pub use topology::Topology;

pub use shoebox_core::{
    // Error types
    BoxError,
    ConfigError,
    DecodeError,
    // Hook
    DynHook,
    // Domain
    EventKind,
    FieldUpdate,
    // Handler
    Handler,
    HandlerError,
    HandlerResult,
    Hook,
    HookResult,
    IngestionEvent,
    IntoResponse,
    // Listener
    Listener,
    // Message
    Message,
    Notification,
    Notifier,
    NotifyError,
    Pipeline,
    QueueError,
    Record,
    RecordChange,
    RecordStore,
    RouteResult,
    Router,
    RoutingError,
    ShoeboxError,
    StoreError,
    ValidationError,
};

pub use shoebox_std::{
    BatchQueue, BatchReport, DeadLetter, Dispatcher, FailurePolicy, InMemoryRecordStore,
    LogNotifier, QueueConfig, RedrivePolicy, SubscriptionFilter, Topic,
};

// Standard hooks
pub use shoebox_std::hooks::{RetryHook, TimeoutHook, TracingHook};

// Re-export crates for advanced usage
pub use shoebox_core;
pub use shoebox_std;
