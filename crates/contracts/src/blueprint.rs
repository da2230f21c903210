//! RouterBlueprint - Config Loader output
//!
//! Describes the complete router setup: ingress sizing, consumer sinks and the
//! subscriptions that bind sinks to filters.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{FilterClause, SubscriptionRequest};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete router configuration blueprint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Ingress and worker settings
    #[serde(default)]
    pub router: RouterSettings,

    /// Consumer sinks
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,

    /// Sink subscriptions
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionConfig>,
}

/// Ingress buffer and routing worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSettings {
    /// Bounded ingress buffer capacity (envelopes)
    #[serde(default = "default_ingress_capacity")]
    pub ingress_capacity: usize,

    /// Number of routing workers draining the ingress buffer
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            ingress_capacity: default_ingress_capacity(),
            workers: default_workers(),
        }
    }
}

fn default_ingress_capacity() -> usize {
    1024
}

fn default_workers() -> usize {
    2
}

/// Sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name (unique)
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity in front of the writer
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Writer-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    Log,
    File,
    Network,
}

/// Binds a sink to a subscription filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Name of the sink receiving matched envelopes
    pub sink: String,

    /// Shard group label (empty = broadcast)
    #[serde(default)]
    pub shard_id: String,

    /// Optional filter clause
    #[serde(default)]
    pub filter: Option<FilterClause>,
}

impl SubscriptionConfig {
    /// Build the request registered with the router
    pub fn to_request(&self) -> SubscriptionRequest {
        SubscriptionRequest {
            shard_id: self.shard_id.clone(),
            filter: self.filter.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Selector;

    #[test]
    fn test_defaults_from_json() {
        let bp: RouterBlueprint = serde_json::from_str(
            r#"{
                "sinks": [{ "name": "log", "sink_type": "log" }],
                "subscriptions": [{ "sink": "log" }]
            }"#,
        )
        .unwrap();

        assert_eq!(bp.version, ConfigVersion::V1);
        assert_eq!(bp.router.ingress_capacity, 1024);
        assert_eq!(bp.router.workers, 2);
        assert_eq!(bp.sinks[0].queue_capacity, 100);
        assert_eq!(bp.subscriptions[0].to_request(), SubscriptionRequest::firehose(""));
    }

    #[test]
    fn test_subscription_to_request() {
        let sub = SubscriptionConfig {
            sink: "s".into(),
            shard_id: "g".into(),
            filter: Some(FilterClause {
                app_id: "app".into(),
                selector: Some(Selector::Metric),
            }),
        };
        assert_eq!(
            sub.to_request(),
            SubscriptionRequest::for_app("g", "app", Some(Selector::Metric))
        );
    }
}
