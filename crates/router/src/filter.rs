//! Filter - registry key
//!
//! A filter scopes "which envelopes" by application id and category. Both
//! dimensions have a wildcard sentinel kept inside the same type:
//! - `app_id == ""` matches every application
//! - `EnvelopeCategory::Any` matches every category

use contracts::{RoutableEnvelope, Selector, SubscriptionRequest};

/// Envelope category as seen by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnvelopeCategory {
    /// Wildcard; never the category of a concrete envelope
    #[default]
    Any,
    Log,
    Metric,
}

impl EnvelopeCategory {
    /// Category of a concrete envelope: logs are `Log`, everything else `Metric`
    pub fn of<E: RoutableEnvelope + ?Sized>(envelope: &E) -> Self {
        if envelope.is_log() {
            Self::Log
        } else {
            Self::Metric
        }
    }
}

impl From<Selector> for EnvelopeCategory {
    fn from(selector: Selector) -> Self {
        match selector {
            Selector::Log => Self::Log,
            Selector::Metric => Self::Metric,
        }
    }
}

/// Registry key, compared and hashed by value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Filter {
    app_id: String,
    category: EnvelopeCategory,
}

impl Filter {
    /// Create a filter
    pub fn new(app_id: impl Into<String>, category: EnvelopeCategory) -> Self {
        Self {
            app_id: app_id.into(),
            category,
        }
    }

    /// Resolve the filter a subscription request registers under
    ///
    /// No clause subscribes to everything; the app id is copied verbatim.
    pub fn from_request(request: &SubscriptionRequest) -> Self {
        match &request.filter {
            None => Self::default(),
            Some(clause) => Self {
                app_id: clause.app_id.clone(),
                category: clause.selector.map(Into::into).unwrap_or_default(),
            },
        }
    }

    /// Every filter an envelope owned by `app_id` matches
    ///
    /// Two app-wildcard filters always match; two app-scoped ones are added
    /// when `app_id` is non-empty. The result holds no duplicates.
    pub fn matching<E: RoutableEnvelope + ?Sized>(app_id: &str, envelope: &E) -> Vec<Filter> {
        let category = EnvelopeCategory::of(envelope);

        let mut filters = Vec::with_capacity(4);
        filters.push(Self::new("", category));
        filters.push(Self::default());

        if !app_id.is_empty() {
            filters.push(Self::new(app_id, EnvelopeCategory::Any));
            filters.push(Self::new(app_id, category));
        }

        filters
    }

    /// Application id (empty = any application)
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Category (`Any` = any category)
    pub fn category(&self) -> EnvelopeCategory {
        self.category
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Envelope;
    use std::collections::HashSet;

    #[test]
    fn test_from_request_without_clause() {
        let filter = Filter::from_request(&SubscriptionRequest::firehose("shard"));
        assert_eq!(filter, Filter::new("", EnvelopeCategory::Any));
    }

    #[test]
    fn test_from_request_with_selector() {
        let req = SubscriptionRequest::for_app("", "app-1", Some(Selector::Log));
        assert_eq!(
            Filter::from_request(&req),
            Filter::new("app-1", EnvelopeCategory::Log)
        );

        let req = SubscriptionRequest::for_app("", "app-1", Some(Selector::Metric));
        assert_eq!(Filter::from_request(&req).category(), EnvelopeCategory::Metric);

        let req = SubscriptionRequest::for_app("", "app-1", None);
        assert_eq!(Filter::from_request(&req).category(), EnvelopeCategory::Any);
    }

    #[test]
    fn test_app_id_copied_verbatim() {
        let req = SubscriptionRequest::for_app("", "  App-1 ", None);
        assert_eq!(Filter::from_request(&req).app_id(), "  App-1 ");
    }

    #[test]
    fn test_category_of_envelope() {
        assert_eq!(
            EnvelopeCategory::of(&Envelope::log("o", "a", "x")),
            EnvelopeCategory::Log
        );
        assert_eq!(
            EnvelopeCategory::of(&Envelope::counter("o", "n", 1, 1)),
            EnvelopeCategory::Metric
        );
        assert_eq!(
            EnvelopeCategory::of(&Envelope::gauge("o", "n", 1.0, "")),
            EnvelopeCategory::Metric
        );
    }

    #[test]
    fn test_matching_without_app_id() {
        let filters = Filter::matching("", &Envelope::log("o", "", "x"));
        assert_eq!(
            filters,
            vec![
                Filter::new("", EnvelopeCategory::Log),
                Filter::new("", EnvelopeCategory::Any),
            ]
        );
    }

    #[test]
    fn test_matching_with_app_id() {
        let filters = Filter::matching("app-1", &Envelope::counter("o", "n", 1, 1));
        assert_eq!(filters.len(), 4);

        let unique: HashSet<_> = filters.iter().cloned().collect();
        assert_eq!(unique.len(), 4);
        assert!(unique.contains(&Filter::new("", EnvelopeCategory::Metric)));
        assert!(unique.contains(&Filter::new("", EnvelopeCategory::Any)));
        assert!(unique.contains(&Filter::new("app-1", EnvelopeCategory::Any)));
        assert!(unique.contains(&Filter::new("app-1", EnvelopeCategory::Metric)));
    }
}
