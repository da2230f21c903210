//! Pipeline orchestrator - coordinates all components.
//!
//! Wires one input source into the ingress buffer, drains it with routing
//! workers and tears everything down in order once the source ends, the
//! timeout fires or a shutdown signal arrives.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{ContractError, Envelope, EnvelopeStream, RouterBlueprint};
use ingestion::{IngressServer, JsonLinesStream, MockEnvelopeSource};
use observability::ThroughputAggregator;
use router::{Router, RoutingWorkers};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::{PipelineStats, RunOutcome};
use crate::error::CliError;

/// Throughput sampling period
const SAMPLE_PERIOD: Duration = Duration::from_secs(1);

/// Where envelopes come from
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// Synthetic envelopes at the given rate (0 = unthrottled)
    Mock { rate_hz: f64 },
    /// JSON lines file
    File(PathBuf),
    /// JSON lines on standard input
    Stdin,
}

impl InputSource {
    /// Resolve `--input`: absent means mock, `-` means stdin
    pub fn from_arg(input: Option<&PathBuf>, mock_rate: f64) -> Self {
        match input {
            None => Self::Mock { rate_hz: mock_rate },
            Some(path) if path.as_os_str() == "-" => Self::Stdin,
            Some(path) => Self::File(path.clone()),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The router blueprint
    pub blueprint: RouterBlueprint,

    /// Envelope source
    pub input: InputSource,

    /// Maximum number of envelopes to ingest (None = unlimited)
    pub max_envelopes: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline until the source ends, the timeout fires or
    /// `shutdown` resolves, then drain and report
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let launch = self.open_source().await?;
        self.run_with(launch, shutdown).await
    }

    /// Route whatever `launch` feeds into the ingress server
    ///
    /// Ingress is closed, workers joined and setters drained on every exit
    /// path, including a failed source.
    async fn run_with<F>(self, launch: SourceLauncher, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - every envelope will be unmatched");
        }

        // Sinks and subscriptions
        let (router, installation) = router::build_router(blueprint)
            .await
            .context("Failed to install sinks and subscriptions")?;

        info!(
            filters = router.filter_count(),
            subscriptions = router.subscription_count(),
            "Router ready"
        );

        // Ingress and routing workers
        let mut server = IngressServer::new(blueprint.router.ingress_capacity);
        let Some(rx) = server.take_receiver() else {
            installation.uninstall(&router).await;
            return Err(CliError::pipeline_execution("ingress receiver already taken").into());
        };
        let server = Arc::new(server);
        let workers = RoutingWorkers::spawn(Arc::clone(&router), rx, blueprint.router.workers);
        let worker_count = workers.len();

        info!(
            input = ?self.config.input,
            max_envelopes = ?self.config.max_envelopes,
            "Pipeline running"
        );

        let mut driven = drive(launch(&server), self.config.timeout, shutdown, &router).await;

        // Shutdown
        info!("Shutting down pipeline...");
        server.close();
        let routed = workers.join().await;
        driven.throughput.sample(
            router.metrics().snapshot().dispatched,
            driven.last_sample.elapsed().as_secs_f64(),
        );

        let subscriptions = router.subscription_count();
        let setters = installation.uninstall(&router).await;

        if let Some(failure) = driven.failure {
            return Err(CliError::pipeline_execution(failure).into());
        }

        let stats = PipelineStats {
            outcome: driven.outcome,
            duration: start_time.elapsed(),
            workers: worker_count,
            subscriptions,
            routed,
            ingress: server.metrics().snapshot(),
            routing: router.metrics().snapshot(),
            setters,
            throughput: driven.throughput.summary(),
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            rate = format!("{:.2}", stats.rate()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }

    /// Prepare the configured source; files are opened before anything is built
    async fn open_source(&self) -> Result<SourceLauncher> {
        let max = self.config.max_envelopes;

        let launch: SourceLauncher = match &self.config.input {
            InputSource::Mock { rate_hz } => {
                info!(rate_hz, "Running with MOCK envelope source");
                let mut source = MockEnvelopeSource::with_rate(*rate_hz);
                if let Some(limit) = max {
                    source = source.limit(limit);
                }
                Box::new(move |server: &Arc<IngressServer>| {
                    server.spawn_sender("mock", source)
                })
            }
            InputSource::File(path) => {
                let stream = JsonLinesStream::open(path)
                    .await
                    .map_err(|e| CliError::input_open(path, e.to_string()))?;
                info!(path = %path.display(), "Reading envelopes from file");
                let name = stream.name().to_string();
                Box::new(move |server: &Arc<IngressServer>| {
                    server.spawn_sender(name, Limited::new(stream, max))
                })
            }
            InputSource::Stdin => {
                info!("Reading envelopes from stdin");
                Box::new(move |server: &Arc<IngressServer>| {
                    server.spawn_sender("stdin", Limited::new(JsonLinesStream::stdin(), max))
                })
            }
        };

        Ok(launch)
    }
}

/// Starts the ingest task against the running ingress server
type SourceLauncher =
    Box<dyn FnOnce(&Arc<IngressServer>) -> JoinHandle<ingestion::Result<u64>> + Send>;

/// How the ingest phase ended
struct Driven {
    outcome: RunOutcome,
    /// Set when the ingest task itself died
    failure: Option<String>,
    throughput: ThroughputAggregator,
    last_sample: Instant,
}

/// Wait for the ingest task while sampling throughput
async fn drive<F>(
    mut ingest: JoinHandle<ingestion::Result<u64>>,
    timeout: Option<Duration>,
    shutdown: F,
    router: &Router,
) -> Driven
where
    F: Future<Output = ()>,
{
    let deadline = async move {
        match timeout {
            Some(t) => tokio::time::sleep(t).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    tokio::pin!(shutdown);

    let mut ticker = interval(SAMPLE_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut throughput = ThroughputAggregator::new();
    let mut last_sample = Instant::now();
    let mut failure = None;

    let outcome = loop {
        tokio::select! {
            joined = &mut ingest => {
                match joined {
                    Ok(Ok(count)) => debug!(count, "Input source finished"),
                    Ok(Err(e)) => warn!(error = %e, "Input source ended with error"),
                    Err(e) => {
                        error!(error = %e, "Ingest task failed");
                        failure = Some(format!("ingest task failed: {e}"));
                        break RunOutcome::Failed;
                    }
                }
                break RunOutcome::Completed;
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                throughput.sample(
                    router.metrics().snapshot().dispatched,
                    now.duration_since(last_sample).as_secs_f64(),
                );
                last_sample = now;
            }
            _ = &mut deadline => {
                warn!(timeout_secs = timeout.map(|t| t.as_secs()), "Pipeline timed out");
                ingest.abort();
                break RunOutcome::TimedOut;
            }
            _ = &mut shutdown => {
                warn!("Received shutdown signal, stopping pipeline...");
                ingest.abort();
                break RunOutcome::Interrupted;
            }
        }
    };

    Driven {
        outcome,
        failure,
        throughput,
        last_sample,
    }
}

/// Ends the wrapped stream after a fixed number of envelopes
struct Limited<S> {
    inner: S,
    remaining: Option<u64>,
}

impl<S> Limited<S> {
    fn new(inner: S, limit: Option<u64>) -> Self {
        Self {
            inner,
            remaining: limit,
        }
    }
}

impl<S: EnvelopeStream> EnvelopeStream for Limited<S> {
    async fn recv(&mut self) -> Result<Option<Envelope>, ContractError> {
        match self.remaining {
            Some(0) => Ok(None),
            Some(ref mut remaining) => {
                *remaining -= 1;
                self.inner.recv().await
            }
            None => self.inner.recv().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SinkConfig, SinkType, SubscriptionConfig};
    use std::collections::HashMap;
    use std::io::Write;

    fn file_blueprint(path: &std::path::Path) -> RouterBlueprint {
        let mut params = HashMap::new();
        params.insert("path".to_string(), path.display().to_string());

        RouterBlueprint {
            sinks: vec![SinkConfig {
                name: "archive".to_string(),
                sink_type: SinkType::File,
                queue_capacity: 1024,
                params,
            }],
            subscriptions: vec![SubscriptionConfig {
                sink: "archive".to_string(),
                shard_id: String::new(),
                filter: None,
            }],
            ..Default::default()
        }
    }

    fn config(blueprint: RouterBlueprint, input: InputSource) -> PipelineConfig {
        PipelineConfig {
            blueprint,
            input,
            max_envelopes: None,
            timeout: None,
            metrics_port: None,
        }
    }

    #[test]
    fn test_input_source_from_arg() {
        assert_eq!(
            InputSource::from_arg(None, 5.0),
            InputSource::Mock { rate_hz: 5.0 }
        );
        assert_eq!(
            InputSource::from_arg(Some(&PathBuf::from("-")), 5.0),
            InputSource::Stdin
        );
        assert_eq!(
            InputSource::from_arg(Some(&PathBuf::from("in.jsonl")), 5.0),
            InputSource::File(PathBuf::from("in.jsonl"))
        );
    }

    #[tokio::test]
    async fn test_mock_run_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.jsonl");

        let mut config = config(file_blueprint(&out), InputSource::Mock { rate_hz: 0.0 });
        config.max_envelopes = Some(30);

        let stats = Pipeline::new(config)
            .run(std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.outcome, RunOutcome::Completed);
        assert_eq!(stats.ingress.envelopes_received, 30);
        assert_eq!(stats.routed, stats.ingress.accepted());
        assert_eq!(stats.routing.dispatched, stats.routed);

        let written = std::fs::read_to_string(&out).unwrap().lines().count() as u64;
        assert_eq!(written, stats.setters[0].1.write_count);
    }

    #[tokio::test]
    async fn test_final_throughput_sample_uses_real_elapsed_time() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.jsonl");

        let mut config = config(file_blueprint(&out), InputSource::Mock { rate_hz: 0.0 });
        config.max_envelopes = Some(200);

        let stats = Pipeline::new(config)
            .run(std::future::pending())
            .await
            .unwrap();

        // The last sample covers at most the whole run, so its rate is at
        // least the overall average
        let average = stats.routing.dispatched as f64 / stats.duration.as_secs_f64();
        assert_eq!(stats.throughput.total, 200);
        assert!(stats.throughput.rate.max >= average);
    }

    #[tokio::test]
    async fn test_file_input_routes_every_line() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.jsonl");
        let input = dir.path().join("in.jsonl");

        let mut file = std::fs::File::create(&input).unwrap();
        for i in 0..5 {
            let envelope = Envelope::log("test", "app", format!("line {i}"));
            writeln!(file, "{}", serde_json::to_string(&envelope).unwrap()).unwrap();
        }
        writeln!(file, "not json").unwrap();
        drop(file);

        let stats = Pipeline::new(config(file_blueprint(&out), InputSource::File(input)))
            .run(std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.routed, 5);
        assert_eq!(stats.routing.unmatched, 0);

        let decoded: Vec<Envelope> = std::fs::read_to_string(&out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(decoded.len(), 5);
    }

    #[tokio::test]
    async fn test_missing_input_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.jsonl");

        let result = Pipeline::new(config(
            file_blueprint(&out),
            InputSource::File(dir.path().join("missing.jsonl")),
        ))
        .run(std::future::pending())
        .await;

        assert!(result.is_err());
    }

    /// Yields `remaining` envelopes, then panics
    struct PanicAfter {
        remaining: u32,
    }

    impl EnvelopeStream for PanicAfter {
        async fn recv(&mut self) -> Result<Option<Envelope>, ContractError> {
            if self.remaining == 0 {
                panic!("source crashed");
            }
            self.remaining -= 1;
            Ok(Some(Envelope::log("test", "app", "before crash")))
        }
    }

    #[tokio::test]
    async fn test_crashed_source_still_drains_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.jsonl");

        let pipeline = Pipeline::new(config(file_blueprint(&out), InputSource::Stdin));
        let launch: SourceLauncher = Box::new(|server: &Arc<IngressServer>| {
            server.spawn_sender("crashing", PanicAfter { remaining: 3 })
        });

        let result = pipeline.run_with(launch, std::future::pending()).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Pipeline execution failed"));

        // Routed envelopes were flushed by the file writer before the error surfaced
        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_shutdown_signal_interrupts_endless_source() {
        let config = config(RouterBlueprint::default(), InputSource::Mock { rate_hz: 1000.0 });

        let stats = Pipeline::new(config)
            .run(tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();

        assert_eq!(stats.outcome, RunOutcome::Interrupted);
        assert_eq!(stats.routing.unmatched, stats.routing.dispatched);
    }

    #[tokio::test]
    async fn test_timeout_stops_endless_source() {
        let mut config = config(RouterBlueprint::default(), InputSource::Mock { rate_hz: 1000.0 });
        config.timeout = Some(Duration::from_millis(50));

        let stats = Pipeline::new(config)
            .run(std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.outcome, RunOutcome::TimedOut);
    }
}
