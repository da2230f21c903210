//! 路由指标收集模块
//!
//! 记录信封从入口到订阅者的各阶段计数，并在内存中聚合吞吐统计。

use metrics::{counter, gauge, histogram};

/// 记录入口收到的信封
pub fn record_envelope_received(kind: &str) {
    counter!(
        "telemetry_router_envelopes_received_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// 记录被入口拒绝的无效信封 (无事件)
pub fn record_envelope_invalid() {
    counter!("telemetry_router_envelopes_invalid_total").increment(1);
}

/// 记录入口缓冲区满而丢弃的信封
pub fn record_ingress_dropped() {
    counter!("telemetry_router_ingress_dropped_total").increment(1);
}

/// 记录入口缓冲区深度
pub fn record_ingress_depth(depth: usize) {
    gauge!("telemetry_router_ingress_depth").set(depth as f64);
}

/// 记录当前活跃的入口流数量
pub fn record_ingress_streams(count: usize) {
    gauge!("telemetry_router_ingress_streams").set(count as f64);
}

/// 记录一次分发
///
/// `matched == false` 表示没有任何订阅者匹配。
pub fn record_envelope_dispatched(matched: bool) {
    let status = if matched { "matched" } else { "unmatched" };
    counter!(
        "telemetry_router_envelopes_dispatched_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录一次分发产生的投递次数
pub fn record_deliveries(broadcast: u64, sharded: u64) {
    if broadcast > 0 {
        counter!("telemetry_router_deliveries_total", "mode" => "broadcast").increment(broadcast);
    }
    if sharded > 0 {
        counter!("telemetry_router_deliveries_total", "mode" => "sharded").increment(sharded);
    }
    histogram!("telemetry_router_fanout").record((broadcast + sharded) as f64);
}

/// 记录序列化失败而被丢弃的信封
pub fn record_marshal_failure() {
    counter!("telemetry_router_marshal_failures_total").increment(1);
}

/// 记录当前订阅数量
pub fn record_subscriptions(count: usize) {
    gauge!("telemetry_router_subscriptions").set(count as f64);
}

/// 记录订阅者写入结果
pub fn record_setter_write(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "telemetry_router_setter_writes_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录订阅者队列满而丢弃的信封
pub fn record_setter_dropped(sink_name: &str) {
    counter!(
        "telemetry_router_setter_dropped_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
}

/// 吞吐聚合器
///
/// 按采样周期记录分发数量，统计每秒吞吐率。
#[derive(Debug, Clone, Default)]
pub struct ThroughputAggregator {
    /// 总采样次数
    pub samples: u64,

    /// 上次采样时的累计分发数
    last_total: u64,

    /// 每秒分发速率统计
    pub rate_stats: RunningStats,
}

impl ThroughputAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次采样
    ///
    /// `total` 为累计分发数，`elapsed_secs` 为距上次采样的秒数。
    pub fn sample(&mut self, total: u64, elapsed_secs: f64) {
        let delta = total.saturating_sub(self.last_total);
        self.last_total = total;
        self.samples += 1;

        if elapsed_secs > 0.0 {
            self.rate_stats.push(delta as f64 / elapsed_secs);
        }
    }

    /// 生成摘要
    pub fn summary(&self) -> ThroughputSummary {
        ThroughputSummary {
            total: self.last_total,
            samples: self.samples,
            rate: StatsSummary::from(&self.rate_stats),
        }
    }
}

/// 吞吐摘要
#[derive(Debug, Clone, Default)]
pub struct ThroughputSummary {
    pub total: u64,
    pub samples: u64,
    pub rate: StatsSummary,
}

impl std::fmt::Display for ThroughputSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Throughput Summary ===")?;
        writeln!(f, "Envelopes dispatched: {}", self.total)?;
        writeln!(f, "Samples: {}", self.samples)?;
        writeln!(f, "Rate (envelopes/s): {}", self.rate)
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_throughput_sampling() {
        let mut aggregator = ThroughputAggregator::new();

        aggregator.sample(100, 1.0);
        aggregator.sample(300, 1.0);
        // 零时长采样只更新累计值
        aggregator.sample(300, 0.0);

        let summary = aggregator.summary();
        assert_eq!(summary.total, 300);
        assert_eq!(summary.samples, 3);
        assert_eq!(summary.rate.count, 2);
        assert!((summary.rate.mean - 150.0).abs() < 1e-10);
        assert!((summary.rate.max - 200.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let summary = ThroughputSummary {
            total: 1000,
            samples: 10,
            rate: StatsSummary {
                count: 10,
                min: 80.0,
                max: 120.0,
                mean: 100.0,
                std_dev: 12.5,
            },
        };

        let output = format!("{}", summary);
        assert!(output.contains("Envelopes dispatched: 1000"));
        assert!(output.contains("mean=100.000"));
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_envelope_received("log");
        record_envelope_dispatched(false);
        record_deliveries(3, 1);
        record_setter_write("console", true);
    }
}
