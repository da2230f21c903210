//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 端到端路由测试：入口 -> 路由 worker -> Router -> 缓冲订阅者
//! - 配置加载到订阅安装的全链路

#[cfg(test)]
mod contract_tests {
    use contracts::{Envelope, RoutableEnvelope, SubscriptionRequest};

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_envelope_json_snapshot() {
        let envelope = Envelope::log("rep", "app-1", "hello")
            .with_provenance("cf", "diego-cell", "0", "10.0.0.1");

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["origin"], "rep");
        assert_eq!(value["source_id"], "app-1");
        assert_eq!(value["job"], "diego-cell");
        assert!(envelope.is_log());
    }

    #[test]
    fn test_subscription_request_defaults() {
        let request: SubscriptionRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, SubscriptionRequest::firehose(""));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::{HashMap, HashSet};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use bytes::Bytes;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        ContractError, Envelope, EnvelopeWriter, FilterClause, RouterBlueprint, Selector,
        SinkConfig, SinkType, SubscriptionConfig, SubscriptionRequest,
    };
    use ingestion::{IngressServer, JsonLinesStream, MockEnvelopeSource, MockSourceConfig};
    use router::{FileWriter, Router, RoutingWorkers, SetterHandle};
    use tempfile::TempDir;

    fn file_sink(dir: &TempDir, name: &str) -> (SinkConfig, PathBuf) {
        let path = dir.path().join(format!("{name}.jsonl"));
        let mut params = HashMap::new();
        params.insert("path".to_string(), path.display().to_string());
        (
            SinkConfig {
                name: name.to_string(),
                sink_type: SinkType::File,
                queue_capacity: 4096,
                params,
            },
            path,
        )
    }

    fn subscribe(sink: &str, shard_id: &str, filter: Option<FilterClause>) -> SubscriptionConfig {
        SubscriptionConfig {
            sink: sink.to_string(),
            shard_id: shard_id.to_string(),
            filter,
        }
    }

    fn read_envelopes(path: &Path) -> Vec<Envelope> {
        match std::fs::read_to_string(path) {
            Ok(contents) => contents
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn provenance(envelope: &Envelope) -> (String, String, String, String) {
        (
            envelope.deployment.clone(),
            envelope.job.clone(),
            envelope.index.clone(),
            envelope.ip.clone(),
        )
    }

    /// Run `source` through ingress, workers and the installed blueprint
    async fn route_all(blueprint: &RouterBlueprint, source: MockEnvelopeSource) -> u64 {
        let (router, installation) = router::build_router(blueprint).await.unwrap();

        let mut server = IngressServer::new(blueprint.router.ingress_capacity);
        let rx = server.take_receiver().unwrap();
        let workers = RoutingWorkers::spawn(Arc::clone(&router), rx, blueprint.router.workers);

        let ingested = server.sender("mock", source).await.unwrap();
        server.close();
        let routed = workers.join().await;
        assert_eq!(routed, ingested, "ingress buffer should be large enough");

        installation.uninstall(&router).await;
        assert_eq!(router.subscription_count(), 0);
        routed
    }

    /// End-to-end test: MockEnvelopeSource -> IngressServer -> RoutingWorkers -> file sinks
    ///
    /// 验证完整的数据流：
    /// 1. 全量订阅收到每个信封
    /// 2. 应用日志订阅只收到该应用的日志
    /// 3. 写出的信封与路由前相同
    #[tokio::test]
    async fn test_e2e_mock_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let (all_sink, all_path) = file_sink(&dir, "all");
        let (logs_sink, logs_path) = file_sink(&dir, "app1-logs");

        let blueprint = RouterBlueprint {
            sinks: vec![all_sink, logs_sink],
            subscriptions: vec![
                subscribe("all", "", None),
                subscribe(
                    "app1-logs",
                    "",
                    Some(FilterClause {
                        app_id: "app-1".to_string(),
                        selector: Some(Selector::Log),
                    }),
                ),
            ],
            ..Default::default()
        };

        let source = MockEnvelopeSource::new(MockSourceConfig {
            rate_hz: 0.0,
            limit: Some(90),
            ..Default::default()
        });
        let routed = route_all(&blueprint, source).await;
        assert_eq!(routed, 90);

        let all = read_envelopes(&all_path);
        assert_eq!(all.len(), 90);

        let logs = read_envelopes(&logs_path);
        assert!(!logs.is_empty());
        assert!(logs.iter().all(|e| e.source_id == "app-1" && e.kind() == "log"));

        let expected = all
            .iter()
            .filter(|e| e.source_id == "app-1" && e.kind() == "log")
            .count();
        assert_eq!(logs.len(), expected);
    }

    /// A shard group splits the stream; a broadcast member alongside it sees everything
    #[tokio::test]
    async fn test_shard_group_partitions_by_provenance() {
        let dir = tempfile::tempdir().unwrap();
        let (a, a_path) = file_sink(&dir, "member-a");
        let (b, b_path) = file_sink(&dir, "member-b");
        let (c, c_path) = file_sink(&dir, "member-c");
        let (audit, audit_path) = file_sink(&dir, "audit");

        let blueprint = RouterBlueprint {
            sinks: vec![a, b, c, audit],
            subscriptions: vec![
                subscribe("member-a", "workers", None),
                subscribe("member-b", "workers", None),
                subscribe("member-c", "workers", None),
                subscribe("audit", "", None),
            ],
            ..Default::default()
        };

        let source = MockEnvelopeSource::new(MockSourceConfig {
            jobs: vec!["diego-cell".into(), "router".into(), "api".into()],
            instances: 5,
            rate_hz: 0.0,
            limit: Some(300),
            ..Default::default()
        });
        route_all(&blueprint, source).await;

        let members: Vec<Vec<Envelope>> = [&a_path, &b_path, &c_path]
            .iter()
            .map(|p| read_envelopes(p))
            .collect();
        let audit = read_envelopes(&audit_path);

        // Every envelope reaches exactly one group member plus the broadcast sink
        let delivered: usize = members.iter().map(Vec::len).sum();
        assert_eq!(delivered, 300);
        assert_eq!(audit.len(), 300);

        // The same provenance always lands on the same member
        let mut owner: HashMap<_, usize> = HashMap::new();
        for (i, envelopes) in members.iter().enumerate() {
            for envelope in envelopes {
                let previous = owner.insert(provenance(envelope), i);
                assert!(previous.is_none() || previous == Some(i));
            }
        }

        // 15 distinct sources should not all collapse onto one member
        let used: HashSet<usize> = owner.values().copied().collect();
        assert!(used.len() > 1);
    }

    /// Config text -> validated blueprint -> installed subscriptions -> delivery
    #[tokio::test]
    async fn test_config_to_install() {
        let dir = tempfile::tempdir().unwrap();
        let metrics_path = dir.path().join("metrics.jsonl");

        let toml = format!(
            r#"
[router]
ingress_capacity = 64
workers = 1

[[sinks]]
name = "metrics"
sink_type = "file"
params = {{ path = "{}" }}

[[sinks]]
name = "console"
sink_type = "log"

[[subscriptions]]
sink = "metrics"
filter = {{ selector = "metric" }}

[[subscriptions]]
sink = "console"
"#,
            metrics_path.display()
        );

        let blueprint = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert!(config_loader::warnings(&blueprint).is_empty());

        let (router, installation) = router::build_router(&blueprint).await.unwrap();
        assert_eq!(router.subscription_count(), 2);
        assert_eq!(router.filter_count(), 2);

        let counter = Envelope::counter("rep", "requests", 1, 1).with_source_id("app-1");
        let log = Envelope::log("rep", "app-1", "hello");
        router.dispatch("app-1", &counter);
        router.dispatch("app-1", &log);

        let setters: HashMap<String, _> = installation.uninstall(&router).await.into_iter().collect();
        assert_eq!(setters["metrics"].write_count, 1);
        assert_eq!(setters["console"].write_count, 2);
        assert_eq!(read_envelopes(&metrics_path), vec![counter]);
        assert_eq!(router.metrics().snapshot().deliveries, 3);
    }

    /// JSON lines input routed straight into a buffered file setter
    #[tokio::test]
    async fn test_json_lines_into_buffered_setter() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.jsonl");
        let mut params = HashMap::new();
        params.insert("path".to_string(), out.display().to_string());
        let handle = SetterHandle::spawn(FileWriter::from_params("out", &params).unwrap(), 64);

        let router = Arc::new(Router::new());
        router.register(&SubscriptionRequest::for_app("", "app-1", None), handle.setter());

        let originals = vec![
            Envelope::log("rep", "app-1", "first"),
            Envelope::counter("rep", "requests", 2, 5).with_source_id("app-1"),
            Envelope::log("rep", "app-2", "other app"),
        ];
        let mut input = String::from("# captured envelopes\n");
        for envelope in &originals {
            input.push_str(&serde_json::to_string(envelope).unwrap());
            input.push('\n');
        }

        let mut server = IngressServer::new(16);
        let rx = server.take_receiver().unwrap();
        let workers = RoutingWorkers::spawn(Arc::clone(&router), rx, 2);

        let stream = JsonLinesStream::new("memory", tokio::io::BufReader::new(input.as_bytes()));
        assert_eq!(server.sender("memory", stream).await.unwrap(), 3);
        server.close();
        workers.join().await;
        handle.shutdown().await;

        let mut written = read_envelopes(&out);
        written.sort_by_key(|e| e.kind());
        let mut expected: Vec<Envelope> = originals[..2].to_vec();
        expected.sort_by_key(|e| e.kind());
        assert_eq!(written, expected);
        assert_eq!(router.metrics().snapshot().unmatched, 1);
    }

    /// Writer that takes a long time per envelope
    struct StallWriter;

    impl EnvelopeWriter for StallWriter {
        fn name(&self) -> &str {
            "stall"
        }

        async fn write(&mut self, _data: &Bytes) -> Result<(), ContractError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    /// A stalled consumer loses its own envelopes without slowing the others
    #[tokio::test]
    async fn test_slow_consumer_does_not_starve_others() {
        let seen = Arc::new(Mutex::new(0u64));
        let fast_seen = Arc::clone(&seen);

        let router = Router::new();
        router.register(
            &SubscriptionRequest::firehose(""),
            Arc::new(move |_: Bytes| {
                *fast_seen.lock().unwrap() += 1;
            }),
        );

        let slow = SetterHandle::spawn(StallWriter, 1);
        router.register(&SubscriptionRequest::firehose(""), slow.setter());

        for i in 0..200u64 {
            router.dispatch("", &Envelope::counter("rep", "n", 1, i));
        }

        assert_eq!(*seen.lock().unwrap(), 200);
        assert_eq!(router.metrics().snapshot().deliveries, 400);

        let metrics = Arc::clone(slow.metrics());
        slow.shutdown().await;
        let snapshot = metrics.snapshot();
        assert!(snapshot.dropped_count > 0);
        assert_eq!(snapshot.dropped_count + snapshot.write_count, 200);
    }
}
