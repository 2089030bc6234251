//! Album records and the keyed store that owns them.

use crate::{
    error::StoreError,
    event::{EventKind, Routable, attr},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One album entry, keyed by `file_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Primary key; the fully decoded object key.
    pub file_name: String,
    /// Free-text description, absent until a description edit arrives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Record {
    /// A record with no content, as written when an upload is accepted.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content: None,
        }
    }

    /// Sets the content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// A partial update applied to an existing record.
///
/// Only non-key fields are expressible here, so an update can never change
/// `file_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    /// `content = value`.
    SetContent(String),
    /// Removes the content.
    ClearContent,
}

impl FieldUpdate {
    /// Applies the update in place.
    pub fn apply(&self, record: &mut Record) {
        match self {
            FieldUpdate::SetContent(value) => record.content = Some(value.clone()),
            FieldUpdate::ClearContent => record.content = None,
        }
    }
}

/// A description edit as it landed in the store.
///
/// Carries the content the record held before the edit, which the store
/// returns from [`RecordStore::update`]; reading the record afterwards would
/// only see the new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordChange {
    /// Key of the edited record.
    pub file_name: String,
    /// Content before the edit.
    pub old_content: Option<String>,
    /// Content after the edit.
    pub new_content: String,
}

impl RecordChange {
    /// Builds the change from the record as it was before `new_content` was
    /// written.
    pub fn from_previous(previous: Record, new_content: impl Into<String>) -> Self {
        Self {
            file_name: previous.file_name,
            old_content: previous.content,
            new_content: new_content.into(),
        }
    }
}

impl Routable for RecordChange {
    fn kind(&self) -> EventKind {
        EventKind::Modified
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        match name {
            attr::OBJECT_NAME | attr::NAME => Some(&self.file_name),
            attr::DESCRIPTION => Some(&self.new_content),
            _ => None,
        }
    }
}

/// Keyed table holding [`Record`]s.
///
/// Every operation touches exactly one key and is atomic for that key. The
/// pipeline relies on `put`, `update` and `delete` being naturally idempotent
/// rather than on any locking.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Reads the record stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Record>, StoreError>;

    /// Inserts or overwrites a record, returning the previous one.
    async fn put(&self, record: Record) -> Result<Option<Record>, StoreError>;

    /// Applies `update` to the record under `key` if it exists.
    ///
    /// Returns the record as it was before the update, or `None` when the key
    /// is absent, in which case nothing is written.
    async fn update(&self, key: &str, update: FieldUpdate) -> Result<Option<Record>, StoreError>;

    /// Removes the record under `key`, returning it if it existed.
    ///
    /// Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<Option<Record>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_update_touches_content_only() {
        let mut record = Record::new("img.jpg");
        FieldUpdate::SetContent("sunset".into()).apply(&mut record);
        assert_eq!(record, Record::new("img.jpg").with_content("sunset"));

        FieldUpdate::ClearContent.apply(&mut record);
        assert_eq!(record, Record::new("img.jpg"));
    }

    #[test]
    fn change_keeps_previous_content() {
        let change = RecordChange::from_previous(Record::new("cat.png").with_content("grumpy"), "sleepy");

        assert_eq!(change.old_content.as_deref(), Some("grumpy"));
        assert_eq!(change.kind(), EventKind::Modified);
        assert_eq!(change.attribute(attr::OBJECT_NAME), Some("cat.png"));
        assert_eq!(change.attribute(attr::DESCRIPTION), Some("sleepy"));
        assert_eq!(change.attribute(attr::BUCKET), None);
    }
}
