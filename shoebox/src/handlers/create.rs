//! Accepting uploads.

use super::expect_kind;
use shoebox_core::{
    EventKind, Handler, HandlerError, IngestionEvent, Record, RecordStore, ValidationError,
};
use shoebox_std::wire::decode_object_key;
use std::sync::Arc;

/// Extensions accepted as images, compared lower-cased.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["jpeg", "png"];

/// Decodes a raw object key and checks its extension.
///
/// Returns the decoded file name.
pub fn validate_image_key(raw: &str) -> Result<String, ValidationError> {
    let file_name = decode_object_key(raw)?;
    // A trailing dot yields an empty, and so unsupported, extension.
    let extension = match file_name.rsplit_once('.') {
        Some((_, extension)) => extension.to_ascii_lowercase(),
        None => return Err(ValidationError::UndeterminedType { key: file_name }),
    };
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ValidationError::UnsupportedType {
            key: file_name,
            extension,
        });
    }
    Ok(file_name)
}

/// Writes an empty record for every accepted upload.
///
/// A repeated upload overwrites the record, clearing its content.
pub struct CreateHandler {
    store: Arc<dyn RecordStore>,
}

impl CreateHandler {
    /// Creates the handler.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

impl Handler<IngestionEvent> for CreateHandler {
    type Output = Result<(), HandlerError>;

    async fn call(&self, event: IngestionEvent) -> Self::Output {
        expect_kind(&event, EventKind::Created)?;
        let file_name = validate_image_key(&event.source_key)?;
        let previous = self.store.put(Record::new(file_name.clone())).await?;
        tracing::info!(file_name = %file_name, replaced = previous.is_some(), "record created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoebox_std::{InMemoryRecordStore, testing::FlakyStore};

    #[test]
    fn image_keys_are_validated() {
        assert_eq!(validate_image_key("vacation+photo.png").unwrap(), "vacation photo.png");
        assert_eq!(validate_image_key("Beach.JPEG").unwrap(), "Beach.JPEG");
        assert_eq!(
            validate_image_key("doc.txt"),
            Err(ValidationError::UnsupportedType {
                key: "doc.txt".into(),
                extension: "txt".into()
            })
        );
        assert_eq!(
            validate_image_key("README"),
            Err(ValidationError::UndeterminedType { key: "README".into() })
        );
        assert_eq!(
            validate_image_key("trailing."),
            Err(ValidationError::UnsupportedType {
                key: "trailing.".into(),
                extension: String::new()
            })
        );
        assert!(validate_image_key("photo.jpg").is_err());
    }

    #[tokio::test]
    async fn accepted_upload_writes_empty_record() {
        let store = Arc::new(InMemoryRecordStore::new("album"));
        store
            .put(Record::new("vacation photo.png").with_content("old"))
            .await
            .unwrap();
        let handler = CreateHandler::new(store.clone());

        handler
            .call(IngestionEvent::created("vacation+photo.png"))
            .await
            .unwrap();

        assert_eq!(
            store.get("vacation photo.png").await.unwrap(),
            Some(Record::new("vacation photo.png"))
        );
    }

    #[tokio::test]
    async fn rejected_upload_writes_nothing() {
        let store = Arc::new(InMemoryRecordStore::new("album"));
        let handler = CreateHandler::new(store.clone());

        let err = handler.call(IngestionEvent::created("doc.txt")).await.unwrap_err();

        assert!(err.is_permanent());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn store_outage_is_transient() {
        let store = Arc::new(FlakyStore::new(InMemoryRecordStore::new("album"), 1));
        let handler = CreateHandler::new(store.clone());

        let err = handler.call(IngestionEvent::created("a.png")).await.unwrap_err();
        assert!(!err.is_permanent());

        handler.call(IngestionEvent::created("a.png")).await.unwrap();
        assert_eq!(store.inner().len().await, 1);
    }

    #[tokio::test]
    async fn wrong_kind_is_rejected() {
        let handler = CreateHandler::new(Arc::new(InMemoryRecordStore::new("album")));
        let err = handler.call(IngestionEvent::removed("a.png")).await.unwrap_err();
        assert!(matches!(
            err,
            HandlerError::Validation(ValidationError::UnexpectedKind(EventKind::Removed))
        ));
    }
}
