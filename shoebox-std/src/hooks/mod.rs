//! Hook wrappers applied to direct subscriptions.
//!
//! Wrappers compose from the inside out; a direct subscription is typically
//! `TracingHook(RetryHook(TimeoutHook(pipeline)))`, so each attempt gets its
//! own time limit and the span covers all attempts.

pub mod retry;
pub mod timeout;
pub mod trace;

pub use retry::RetryHook;
pub use timeout::{TimeoutError, TimeoutHook};
pub use trace::TracingHook;
