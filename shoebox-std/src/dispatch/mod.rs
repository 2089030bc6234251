//! Queue dispatch: decoding envelopes and acknowledging them per item.

pub mod decoder;
pub mod dispatcher;

pub use decoder::{DeadLetter, DeadLetterDecoder, EnvelopeDecoder, TopicEnvelopeDecoder};
pub use dispatcher::{BatchReport, Dispatcher, FailurePolicy, ItemFailure};
