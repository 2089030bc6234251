//! Applying description edits.

use super::expect_kind;
use shoebox_core::{
    DynHook, EventKind, FieldUpdate, Handler, HandlerError, Hook, IngestionEvent, RecordChange,
    RecordStore, ValidationError, attr,
};
use std::sync::Arc;

/// Sets `content` on an existing record.
///
/// Never creates a record and never touches `file_name`. An edit for a key
/// with no record is dropped with a warning.
///
/// Every applied edit is handed to the change hook, if one is set, as a
/// [`RecordChange`] carrying the previous content. A failing change hook is
/// logged; the edit itself has already succeeded and is not retried.
pub struct UpdateHandler {
    store: Arc<dyn RecordStore>,
    changes: Option<Box<dyn DynHook<RecordChange>>>,
}

impl UpdateHandler {
    /// Creates the handler.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            changes: None,
        }
    }

    /// Reports every applied edit to `hook`.
    pub fn with_changes(mut self, hook: impl Hook<RecordChange>) -> Self {
        self.changes = Some(Box::new(hook));
        self
    }
}

impl Handler<IngestionEvent> for UpdateHandler {
    type Output = Result<(), HandlerError>;

    async fn call(&self, event: IngestionEvent) -> Self::Output {
        expect_kind(&event, EventKind::Modified)?;
        let name = event
            .attribute(attr::NAME)
            .ok_or(ValidationError::MissingAttribute(attr::NAME))?;
        let description = event
            .attribute(attr::DESCRIPTION)
            .ok_or(ValidationError::MissingAttribute(attr::DESCRIPTION))?;

        let update = FieldUpdate::SetContent(description.to_string());
        let Some(previous) = self.store.update(name, update).await? else {
            tracing::warn!(file_name = %name, "description edit for unknown record ignored");
            return Ok(());
        };
        tracing::info!(file_name = %name, "description updated");

        if let Some(changes) = &self.changes {
            let change = RecordChange::from_previous(previous, description);
            if let Err(error) = changes.as_ref().on_event_dyn(&change).await {
                tracing::error!(file_name = %change.file_name, %error, "description change not reported");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoebox_core::{BoxError, HookResult, Record};
    use shoebox_std::{InMemoryRecordStore, testing::RecordingHook};

    struct Unreachable;

    impl Hook<RecordChange> for Unreachable {
        async fn on_event(&self, _change: &RecordChange) -> Result<HookResult, BoxError> {
            Err("mail relay unreachable".into())
        }
    }

    #[tokio::test]
    async fn sets_content_on_existing_record() {
        let store = Arc::new(InMemoryRecordStore::new("album"));
        store.put(Record::new("img.jpg")).await.unwrap();
        let handler = UpdateHandler::new(store.clone());

        let edit = IngestionEvent::modified("img.jpg", "sunset");
        handler.call(edit.clone()).await.unwrap();
        handler.call(edit).await.unwrap();

        assert_eq!(
            store.snapshot().await.into_values().collect::<Vec<_>>(),
            vec![Record::new("img.jpg").with_content("sunset")]
        );
    }

    #[tokio::test]
    async fn unknown_record_is_not_created() {
        let store = Arc::new(InMemoryRecordStore::new("album"));
        let handler = UpdateHandler::new(store.clone());

        handler
            .call(IngestionEvent::modified("ghost.png", "boo"))
            .await
            .unwrap();

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn applied_edits_report_previous_content() {
        let store = Arc::new(InMemoryRecordStore::new("album"));
        store
            .put(Record::new("cat.png").with_content("grumpy"))
            .await
            .unwrap();
        let changes = RecordingHook::new();
        let handler = UpdateHandler::new(store.clone()).with_changes(changes.clone());

        handler.call(IngestionEvent::modified("cat.png", "sleepy")).await.unwrap();
        handler.call(IngestionEvent::modified("ghost.png", "boo")).await.unwrap();

        assert_eq!(
            changes.events(),
            vec![RecordChange {
                file_name: "cat.png".into(),
                old_content: Some("grumpy".into()),
                new_content: "sleepy".into(),
            }]
        );
    }

    #[tokio::test]
    async fn failing_change_hook_keeps_the_edit() {
        let store = Arc::new(InMemoryRecordStore::new("album"));
        store.put(Record::new("img.jpg")).await.unwrap();
        let handler = UpdateHandler::new(store.clone()).with_changes(Unreachable);

        handler.call(IngestionEvent::modified("img.jpg", "sunset")).await.unwrap();

        assert_eq!(
            store.get("img.jpg").await.unwrap(),
            Some(Record::new("img.jpg").with_content("sunset"))
        );
    }

    #[tokio::test]
    async fn missing_description_is_rejected() {
        let handler = UpdateHandler::new(Arc::new(InMemoryRecordStore::new("album")));
        let event = IngestionEvent::new(EventKind::Modified, "img.jpg").with_attribute(attr::NAME, "img.jpg");

        let err = handler.call(event).await.unwrap_err();

        assert!(matches!(
            err,
            HandlerError::Validation(ValidationError::MissingAttribute("description"))
        ));
    }
}
