//! Setter factory - builds buffered setters and registers blueprint subscriptions

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{RouterBlueprint, SinkConfig, SinkType};
use tracing::{info, instrument};

use crate::error::RouterError;
use crate::metrics::SetterMetricsSnapshot;
use crate::router::{Router, SubscriptionHandle};
use crate::setter::SetterHandle;
use crate::sinks::{FileWriter, LogWriter, NetworkWriter};

/// Create a buffered setter from configuration
#[instrument(
    name = "factory_create_setter",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub async fn create_setter(config: &SinkConfig) -> Result<SetterHandle, RouterError> {
    match config.sink_type {
        SinkType::Log => {
            let writer = LogWriter::new(&config.name);
            Ok(SetterHandle::spawn(writer, config.queue_capacity))
        }
        SinkType::File => {
            let writer = FileWriter::from_params(&config.name, &config.params)
                .map_err(|e| RouterError::sink_creation(&config.name, e.to_string()))?;
            Ok(SetterHandle::spawn(writer, config.queue_capacity))
        }
        SinkType::Network => {
            let writer = NetworkWriter::from_params(&config.name, &config.params)
                .await
                .map_err(|e| RouterError::sink_creation(&config.name, e.to_string()))?;
            Ok(SetterHandle::spawn(writer, config.queue_capacity))
        }
    }
}

/// Setters and registrations created from one blueprint
pub struct Installation {
    setters: Vec<SetterHandle>,
    subscriptions: Vec<SubscriptionHandle>,
}

impl Installation {
    /// Create every sink and register every subscription of `blueprint`
    ///
    /// Nothing is registered unless every sink builds and every subscription
    /// names a known sink.
    #[instrument(
        name = "factory_install",
        skip(router, blueprint),
        fields(
            sinks = blueprint.sinks.len(),
            subscriptions = blueprint.subscriptions.len()
        )
    )]
    pub async fn install(router: &Router, blueprint: &RouterBlueprint) -> Result<Self, RouterError> {
        if let Some(missing) = blueprint
            .subscriptions
            .iter()
            .find(|s| !blueprint.sinks.iter().any(|sink| sink.name == s.sink))
        {
            return Err(RouterError::UnknownSink {
                name: missing.sink.clone(),
            });
        }

        let mut setters = Vec::with_capacity(blueprint.sinks.len());
        for sink in &blueprint.sinks {
            match create_setter(sink).await {
                Ok(handle) => setters.push(handle),
                Err(e) => {
                    shutdown_setters(setters).await;
                    return Err(e);
                }
            }
        }

        let subscriptions = {
            let by_name: HashMap<&str, &SetterHandle> =
                setters.iter().map(|h| (h.name(), h)).collect();
            blueprint
                .subscriptions
                .iter()
                .filter_map(|s| {
                    by_name
                        .get(s.sink.as_str())
                        .map(|h| router.register(&s.to_request(), h.setter()))
                })
                .collect::<Vec<_>>()
        };

        info!(
            setters = setters.len(),
            subscriptions = subscriptions.len(),
            "Blueprint installed"
        );

        Ok(Self {
            setters,
            subscriptions,
        })
    }

    /// Registrations made by this installation
    pub fn subscriptions(&self) -> &[SubscriptionHandle] {
        &self.subscriptions
    }

    /// Metrics for every setter
    pub fn metrics(&self) -> Vec<(String, SetterMetricsSnapshot)> {
        self.setters
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Release every registration, then drain and close every setter
    ///
    /// Returns the setter metrics taken after draining.
    #[instrument(name = "factory_uninstall", skip(self, router))]
    pub async fn uninstall(self, router: &Router) -> Vec<(String, SetterMetricsSnapshot)> {
        for handle in &self.subscriptions {
            router.release(handle);
        }

        let metrics: Vec<_> = self
            .setters
            .iter()
            .map(|h| (h.name().to_string(), Arc::clone(h.metrics())))
            .collect();
        shutdown_setters(self.setters).await;

        metrics
            .into_iter()
            .map(|(name, m)| (name, m.snapshot()))
            .collect()
    }
}

async fn shutdown_setters(setters: Vec<SetterHandle>) {
    for handle in setters {
        handle.shutdown().await;
    }
}

/// Convenience wrapper returning the router alongside its installation
pub async fn build_router(
    blueprint: &RouterBlueprint,
) -> Result<(Arc<Router>, Installation), RouterError> {
    let router = Arc::new(Router::new());
    let installation = Installation::install(&router, blueprint).await?;
    Ok((router, installation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Envelope, SubscriptionConfig};
    use tempfile::tempdir;

    fn sink(name: &str, sink_type: SinkType) -> SinkConfig {
        SinkConfig {
            name: name.to_string(),
            sink_type,
            queue_capacity: 16,
            params: HashMap::new(),
        }
    }

    fn subscription(sink: &str, shard_id: &str) -> SubscriptionConfig {
        SubscriptionConfig {
            sink: sink.to_string(),
            shard_id: shard_id.to_string(),
            filter: None,
        }
    }

    #[tokio::test]
    async fn test_install_and_route_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("all.jsonl");
        let mut file_sink = sink("archive", SinkType::File);
        file_sink
            .params
            .insert("path".to_string(), path.display().to_string());

        let blueprint = RouterBlueprint {
            sinks: vec![file_sink, sink("console", SinkType::Log)],
            subscriptions: vec![subscription("archive", ""), subscription("console", "")],
            ..Default::default()
        };

        let (router, installation) = build_router(&blueprint).await.unwrap();
        assert_eq!(router.subscription_count(), 2);

        let envelope = Envelope::log("rep", "app", "hello");
        router.dispatch("app", &envelope);

        let final_metrics = installation.uninstall(&router).await;
        assert_eq!(router.subscription_count(), 0);
        assert_eq!(final_metrics.len(), 2);
        assert!(final_metrics.iter().all(|(_, m)| m.write_count == 1));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_install_rejects_unknown_sink() {
        let blueprint = RouterBlueprint {
            sinks: vec![sink("console", SinkType::Log)],
            subscriptions: vec![subscription("missing", "")],
            ..Default::default()
        };

        let router = Router::new();
        let result = Installation::install(&router, &blueprint).await;

        assert!(matches!(result, Err(RouterError::UnknownSink { name }) if name == "missing"));
        assert_eq!(router.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_network_sink_requires_addr() {
        let result = create_setter(&sink("udp", SinkType::Network)).await;
        assert!(matches!(result, Err(RouterError::SinkCreation { .. })));
    }
}
