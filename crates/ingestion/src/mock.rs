//! Mock 信封源
//!
//! 无真实上游时生成合成信封，来源信息 (job/index/ip) 轮转变化，
//! 便于观察分片组的负载分布。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use contracts::{ContractError, Envelope, EnvelopeStream};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, trace};

/// Mock 信封源配置
#[derive(Debug, Clone)]
pub struct MockSourceConfig {
    /// 来源组件
    pub origin: String,

    /// 部署名
    pub deployment: String,

    /// 轮转使用的 job 名
    pub jobs: Vec<String>,

    /// 每个 job 的实例数
    pub instances: u32,

    /// 轮转使用的应用 ID
    pub apps: Vec<String>,

    /// 发送频率 (Hz)，0 表示不限速
    pub rate_hz: f64,

    /// 最多生成的信封数
    pub limit: Option<u64>,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self {
            origin: "mock-agent".to_string(),
            deployment: "cf".to_string(),
            jobs: vec!["diego-cell".to_string(), "router".to_string()],
            instances: 3,
            apps: vec!["app-1".to_string(), "app-2".to_string(), String::new()],
            rate_hz: 100.0,
            limit: None,
        }
    }
}

/// Mock 信封源
///
/// 每 3 个信封依次为 log、counter、gauge。
pub struct MockEnvelopeSource {
    config: MockSourceConfig,
    sequence: u64,
    ticker: Option<Interval>,
    running: Arc<AtomicBool>,
}

impl MockEnvelopeSource {
    /// 创建新的 Mock 信封源
    pub fn new(config: MockSourceConfig) -> Self {
        Self {
            config,
            sequence: 0,
            ticker: None,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// 以指定频率创建 (其余使用默认配置)
    pub fn with_rate(rate_hz: f64) -> Self {
        Self::new(MockSourceConfig {
            rate_hz,
            ..Default::default()
        })
    }

    /// 限制生成数量
    pub fn limit(mut self, limit: u64) -> Self {
        self.config.limit = Some(limit);
        self
    }

    /// 停止标志，置 false 后流结束
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// 已生成的信封数
    pub fn generated(&self) -> u64 {
        self.sequence
    }

    fn exhausted(&self) -> bool {
        !self.running.load(Ordering::Relaxed)
            || self.config.limit.is_some_and(|limit| self.sequence >= limit)
    }

    /// 生成第 `n` 个信封
    fn build(&self, n: u64) -> Envelope {
        let config = &self.config;
        let pick = |items: &[String], i: u64| -> String {
            if items.is_empty() {
                String::new()
            } else {
                items[(i % items.len() as u64) as usize].clone()
            }
        };

        let job_idx = n % config.jobs.len().max(1) as u64;
        let index = (n / config.jobs.len().max(1) as u64) % u64::from(config.instances.max(1));
        let app = pick(&config.apps, n);

        let envelope = match n % 3 {
            0 => Envelope::log(&config.origin, app, format!("mock line {n}")),
            1 => Envelope::counter(&config.origin, "requests", 1, n / 3 + 1).with_source_id(app),
            _ => Envelope::gauge(&config.origin, "cpu", (n % 100) as f64 / 100.0, "ratio")
                .with_source_id(app),
        };

        let mut envelope = envelope.with_provenance(
            &config.deployment,
            pick(&config.jobs, job_idx),
            index.to_string(),
            format!("10.0.{job_idx}.{index}"),
        );
        envelope.timestamp = now_nanos();
        envelope
    }
}

impl EnvelopeStream for MockEnvelopeSource {
    async fn recv(&mut self) -> Result<Option<Envelope>, ContractError> {
        if self.exhausted() {
            debug!(generated = self.sequence, "mock envelope source stopped");
            return Ok(None);
        }

        if self.config.rate_hz > 0.0 {
            let period = Duration::from_secs_f64(1.0 / self.config.rate_hz);
            let ticker = self.ticker.get_or_insert_with(|| {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker
            });
            ticker.tick().await;
        }

        let envelope = self.build(self.sequence);
        self.sequence += 1;
        trace!(sequence = self.sequence, kind = envelope.kind(), "mock envelope generated");
        Ok(Some(envelope))
    }
}

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default()
}
