//! Event routing: subscription filters and the fan-out topic.

pub mod filter;
pub mod topic;

pub use filter::{AttributeRule, StringMatch, SubscriptionFilter};
pub use topic::{Subscription, Topic, TopicBuilder};
