//! Removing records for deleted objects.

use super::expect_kind;
use shoebox_core::{EventKind, Handler, HandlerError, IngestionEvent, RecordStore};
use shoebox_std::wire::decode_object_key;
use std::sync::Arc;

/// Deletes the record keyed by the decoded object key.
///
/// Deleting an absent key succeeds, so redelivery is harmless.
pub struct DeleteHandler {
    store: Arc<dyn RecordStore>,
}

impl DeleteHandler {
    /// Creates the handler.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

impl Handler<IngestionEvent> for DeleteHandler {
    type Output = Result<(), HandlerError>;

    async fn call(&self, event: IngestionEvent) -> Self::Output {
        expect_kind(&event, EventKind::Removed)?;
        let file_name = decode_object_key(&event.source_key)?;
        match self.store.delete(&file_name).await? {
            Some(_) => tracing::info!(file_name = %file_name, "record deleted"),
            None => tracing::debug!(file_name = %file_name, "no record to delete"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoebox_core::Record;
    use shoebox_std::InMemoryRecordStore;

    #[tokio::test]
    async fn deletes_decoded_key() {
        let store = Arc::new(InMemoryRecordStore::new("album"));
        store.put(Record::new("vacation photo.png")).await.unwrap();
        let handler = DeleteHandler::new(store.clone());

        handler
            .call(IngestionEvent::removed("vacation+photo.png"))
            .await
            .unwrap();

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn deleting_twice_or_never_created_succeeds() {
        let store = Arc::new(InMemoryRecordStore::new("album"));
        store.put(Record::new("keep.png")).await.unwrap();
        let handler = DeleteHandler::new(store.clone());

        handler.call(IngestionEvent::removed("img.jpg")).await.unwrap();
        handler.call(IngestionEvent::removed("img.jpg")).await.unwrap();

        assert_eq!(store.snapshot().await.len(), 1);
    }
}
