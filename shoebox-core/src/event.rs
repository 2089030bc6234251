//! Ingestion events.
//!
//! Every physical object-storage operation and every description edit enters
//! the pipeline as exactly one [`IngestionEvent`]. The event kind is parsed
//! once at the ingress boundary; nothing downstream looks at raw event names.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known attribute names carried by [`IngestionEvent`]s.
pub mod attr {
    /// Storage bucket the object lives in.
    pub const BUCKET: &str = "bucket";
    /// Original storage event name (e.g. `ObjectCreated:Put`).
    pub const EVENT_NAME: &str = "event_name";
    /// Object the event is about; raw key for storage events, name for edits.
    pub const OBJECT_NAME: &str = "object_name";
    /// Record name targeted by a description edit.
    pub const NAME: &str = "name";
    /// New description carried by a description edit.
    pub const DESCRIPTION: &str = "description";
}

const CREATED_PREFIX: &str = "ObjectCreated";
const REMOVED_PREFIX: &str = "ObjectRemoved";

/// What happened to the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// The object was stored.
    Created,
    /// The object was deleted.
    Removed,
    /// The object's description was edited.
    Modified,
}

impl EventKind {
    /// All kinds, in lifecycle order.
    pub const ALL: [EventKind; 3] = [EventKind::Created, EventKind::Removed, EventKind::Modified];

    /// Parses a storage event name by prefix (`ObjectCreated*`, `ObjectRemoved*`).
    ///
    /// Returns `None` for event names the pipeline does not react to.
    pub fn from_event_name(name: &str) -> Option<Self> {
        if name.starts_with(CREATED_PREFIX) {
            Some(EventKind::Created)
        } else if name.starts_with(REMOVED_PREFIX) {
            Some(EventKind::Removed)
        } else {
            None
        }
    }

    /// The canonical storage event name used when an event is re-encoded.
    pub const fn default_event_name(self) -> &'static str {
        match self {
            EventKind::Created => "ObjectCreated:Put",
            EventKind::Removed => "ObjectRemoved:Delete",
            EventKind::Modified => "DescriptionModified",
        }
    }
}

/// Anything a topic can route: it exposes a kind and named attributes.
pub trait Routable {
    /// The event kind used by kind filters.
    fn kind(&self) -> EventKind;

    /// Looks up an attribute used by attribute filters.
    fn attribute(&self, name: &str) -> Option<&str>;
}

/// One lifecycle event, as produced by the ingestion source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionEvent {
    /// Raw object key (percent-encoded for storage events) or record name.
    pub source_key: String,
    /// What happened.
    pub kind: EventKind,
    /// Additional attributes (see [`attr`]).
    pub attributes: BTreeMap<String, String>,
}

impl IngestionEvent {
    /// Creates an event without attributes beyond `object_name`.
    pub fn new(kind: EventKind, source_key: impl Into<String>) -> Self {
        let source_key = source_key.into();
        let mut attributes = BTreeMap::new();
        attributes.insert(attr::OBJECT_NAME.to_string(), source_key.clone());
        Self {
            source_key,
            kind,
            attributes,
        }
    }

    /// A storage `Created` event for `raw_key`.
    pub fn created(raw_key: impl Into<String>) -> Self {
        Self::new(EventKind::Created, raw_key)
    }

    /// A storage `Removed` event for `raw_key`.
    pub fn removed(raw_key: impl Into<String>) -> Self {
        Self::new(EventKind::Removed, raw_key)
    }

    /// A description edit setting `description` on record `name`.
    pub fn modified(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(EventKind::Modified, name.clone())
            .with_attribute(attr::NAME, name)
            .with_attribute(attr::DESCRIPTION, description)
    }

    /// Adds or replaces an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Returns an attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The storage event name, falling back to the canonical name for the kind.
    pub fn event_name(&self) -> &str {
        self.attribute(attr::EVENT_NAME)
            .unwrap_or_else(|| self.kind.default_event_name())
    }
}

impl Routable for IngestionEvent {
    fn kind(&self) -> EventKind {
        self.kind
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        IngestionEvent::attribute(self, name)
    }
}
