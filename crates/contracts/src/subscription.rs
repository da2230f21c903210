//! SubscriptionRequest - Router registration input

use serde::{Deserialize, Serialize};

/// Subscription request
///
/// An empty `shard_id` means "no grouping": every consumer registered under
/// the same filter receives every matching envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    /// Shard group label
    #[serde(default)]
    pub shard_id: String,

    /// Optional filter clause; `None` subscribes to everything
    #[serde(default)]
    pub filter: Option<FilterClause>,
}

/// Filter clause of a subscription request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterClause {
    /// Application id, copied verbatim (empty = any application)
    #[serde(default)]
    pub app_id: String,

    /// Envelope category selector (`None` = any category)
    #[serde(default)]
    pub selector: Option<Selector>,
}

/// Envelope category selector
///
/// A single value, so a clause can never select logs and metrics at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    Log,
    Metric,
}

impl SubscriptionRequest {
    /// Subscribe to every envelope
    pub fn firehose(shard_id: impl Into<String>) -> Self {
        Self {
            shard_id: shard_id.into(),
            filter: None,
        }
    }

    /// Subscribe to one application's envelopes, optionally of one category
    pub fn for_app(
        shard_id: impl Into<String>,
        app_id: impl Into<String>,
        selector: Option<Selector>,
    ) -> Self {
        Self {
            shard_id: shard_id.into(),
            filter: Some(FilterClause {
                app_id: app_id.into(),
                selector,
            }),
        }
    }
}
