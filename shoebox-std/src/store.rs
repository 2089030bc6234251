//! In-memory [`RecordStore`].

use async_trait::async_trait;
use shoebox_core::{FieldUpdate, Record, RecordStore, StoreError};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// A table held in process memory.
///
/// Each operation takes the table lock once, so single-key atomicity holds
/// the same way it does for a hosted key-value table.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    table: String,
    records: RwLock<HashMap<String, Record>>,
}

impl InMemoryRecordStore {
    /// Creates an empty table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns `true` if the table is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Copy of every record, ordered by key.
    pub async fn snapshot(&self) -> BTreeMap<String, Record> {
        self.records
            .read()
            .await
            .iter()
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, key: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, record: Record) -> Result<Option<Record>, StoreError> {
        let previous = self
            .records
            .write()
            .await
            .insert(record.file_name.clone(), record);
        tracing::trace!(table = %self.table, replaced = previous.is_some(), "put");
        Ok(previous)
    }

    async fn update(&self, key: &str, update: FieldUpdate) -> Result<Option<Record>, StoreError> {
        let mut records = self.records.write().await;
        Ok(records.get_mut(key).map(|record| {
            let previous = record.clone();
            update.apply(record);
            previous
        }))
    }

    async fn delete(&self, key: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.records.write().await.remove(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_is_idempotent() {
        let store = InMemoryRecordStore::new("album");
        assert_eq!(store.put(Record::new("a.png")).await.unwrap(), None);
        assert_eq!(
            store.put(Record::new("a.png")).await.unwrap(),
            Some(Record::new("a.png"))
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn update_touches_existing_records_only() {
        let store = InMemoryRecordStore::new("album");
        let missing = store
            .update("ghost.png", FieldUpdate::SetContent("x".into()))
            .await
            .unwrap();
        assert_eq!(missing, None);
        assert!(store.is_empty().await);

        store.put(Record::new("img.jpg")).await.unwrap();
        let previous = store
            .update("img.jpg", FieldUpdate::SetContent("sunset".into()))
            .await
            .unwrap();
        assert_eq!(previous, Some(Record::new("img.jpg")));
        assert_eq!(
            store.get("img.jpg").await.unwrap(),
            Some(Record::new("img.jpg").with_content("sunset"))
        );
    }

    #[tokio::test]
    async fn delete_of_absent_key_succeeds() {
        let store = InMemoryRecordStore::new("album");
        assert_eq!(store.delete("ghost.png").await.unwrap(), None);
        store.put(Record::new("a.png")).await.unwrap();
        assert!(store.delete("a.png").await.unwrap().is_some());
        assert!(store.snapshot().await.is_empty());
    }
}
