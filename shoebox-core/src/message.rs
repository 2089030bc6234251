//! Message trait for event types.

/// A marker trait for events and triggers flowing through the pipeline.
///
/// Messages must be `Send + Sync + 'static` so they can cross task
/// boundaries; every such type is a message.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone)]
/// struct Upload { key: String }
///
/// fn accepts<M: Message>(_: M) {}
/// accepts(Upload { key: "a.png".into() });
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Message",
    label = "must be `Send + Sync + 'static`",
    note = "All events in Shoebox must be thread-safe and static."
)]
pub trait Message: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Message for T {}
