//! Subscription filters.
//!
//! A filter is the predicate a subscriber declares when it attaches to a
//! topic: a set of accepted [`EventKind`]s plus optional attribute rules. It
//! is also a [`Listener`], so a subscription is simply
//! `filter.handler(sink)`.

use shoebox_core::{BoxError, EventKind, Listener, Message, Routable};
use std::collections::BTreeSet;

/// How an attribute value is tested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringMatch {
    /// The value equals the string.
    Exact(String),
    /// The value starts with the string.
    Prefix(String),
    /// The attribute is present, whatever its value.
    Exists,
}

impl StringMatch {
    fn matches(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (StringMatch::Exact(expected), Some(v)) => v == expected,
            (StringMatch::Prefix(prefix), Some(v)) => v.starts_with(prefix.as_str()),
            (StringMatch::Exists, Some(_)) => true,
            (_, None) => false,
        }
    }
}

/// One attribute rule: `attribute` must satisfy `rule`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRule {
    /// Attribute name, e.g. `object_name`.
    pub attribute: String,
    /// Test applied to its value.
    pub rule: StringMatch,
}

/// The predicate a subscriber declares.
///
/// An event matches when its kind is accepted (an empty kind set accepts every
/// kind) and every attribute rule holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    kinds: BTreeSet<EventKind>,
    rules: Vec<AttributeRule>,
}

impl SubscriptionFilter {
    /// A filter that matches every event.
    pub fn any() -> Self {
        Self::default()
    }

    /// A filter that matches a single kind.
    pub fn kind(kind: EventKind) -> Self {
        Self::any().or_kind(kind)
    }

    /// A filter that matches any of the given kinds.
    pub fn kinds(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
            rules: Vec::new(),
        }
    }

    /// Accepts one more kind.
    pub fn or_kind(mut self, kind: EventKind) -> Self {
        self.kinds.insert(kind);
        self
    }

    /// Requires `attribute` to start with `prefix`.
    pub fn attribute_prefix(self, attribute: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.rule(attribute, StringMatch::Prefix(prefix.into()))
    }

    /// Requires `attribute` to equal `value`.
    pub fn attribute_equals(self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        self.rule(attribute, StringMatch::Exact(value.into()))
    }

    /// Requires `attribute` to be present.
    pub fn attribute_exists(self, attribute: impl Into<String>) -> Self {
        self.rule(attribute, StringMatch::Exists)
    }

    /// Adds an attribute rule.
    pub fn rule(mut self, attribute: impl Into<String>, rule: StringMatch) -> Self {
        self.rules.push(AttributeRule {
            attribute: attribute.into(),
            rule,
        });
        self
    }

    /// Evaluates the predicate.
    pub fn matches<E: Routable>(&self, event: &E) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&event.kind()) {
            return false;
        }
        self.rules
            .iter()
            .all(|r| r.rule.matches(event.attribute(&r.attribute)))
    }
}

impl<E> Listener<E> for SubscriptionFilter
where
    E: Message + Routable + Clone,
{
    type Output = E;

    async fn listen(&self, event: &E) -> Result<Option<E>, BoxError> {
        Ok(self.matches(event).then(|| event.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoebox_core::{IngestionEvent, attr};

    #[test]
    fn kind_filters_are_exclusive() {
        let created = IngestionEvent::created("a.png");
        let removed = IngestionEvent::removed("a.png");

        let on_create = SubscriptionFilter::kind(EventKind::Created);
        let on_remove = SubscriptionFilter::kind(EventKind::Removed);

        assert!(on_create.matches(&created));
        assert!(!on_create.matches(&removed));
        assert!(on_remove.matches(&removed));
        assert!(!on_remove.matches(&created));
    }

    #[test]
    fn empty_kind_set_matches_everything() {
        let filter = SubscriptionFilter::any();
        for kind in EventKind::ALL {
            assert!(filter.matches(&IngestionEvent::new(kind, "a.png")));
        }
    }

    #[test]
    fn attribute_prefix_rule() {
        let filter = SubscriptionFilter::kind(EventKind::Modified)
            .attribute_prefix(attr::OBJECT_NAME, "albums/");

        assert!(filter.matches(&IngestionEvent::modified("albums/a.png", "x")));
        assert!(!filter.matches(&IngestionEvent::modified("a.png", "x")));
    }

    #[test]
    fn missing_attribute_never_matches() {
        let filter = SubscriptionFilter::any().attribute_exists(attr::DESCRIPTION);
        assert!(!filter.matches(&IngestionEvent::created("a.png")));
        assert!(filter.matches(&IngestionEvent::modified("a.png", "")));
    }

    #[test]
    fn exact_rule_on_bucket() {
        let filter = SubscriptionFilter::kinds([EventKind::Created, EventKind::Removed])
            .attribute_equals(attr::BUCKET, "images");
        let event = IngestionEvent::created("a.png").with_attribute(attr::BUCKET, "images");
        assert!(filter.matches(&event));
        let other = IngestionEvent::created("a.png").with_attribute(attr::BUCKET, "images-2");
        assert!(!filter.matches(&other));
    }
}
