//! 健康计数注册器
//!
//! 入口服务器通过它维护活跃流数量。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// 活跃入口流数量的计数名
pub const INGRESS_STREAM_COUNT: &str = "ingress_stream_count";

/// 健康计数注册器 trait
pub trait HealthRegistrar: Send + Sync {
    /// 计数加一
    fn inc(&self, name: &str);

    /// 计数减一
    fn dec(&self, name: &str);

    /// 读取当前计数 (未登记的计数为 0)
    fn get(&self, name: &str) -> i64;
}

/// 内存计数注册器
///
/// `ingress_stream_count` 同时导出为 Prometheus gauge。
#[derive(Debug, Default)]
pub struct GaugeHealthRegistrar {
    counts: Mutex<HashMap<String, i64>>,
}

impl GaugeHealthRegistrar {
    /// 创建新的注册器
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, name: &str, delta: i64) {
        let value = {
            let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
            let entry = counts.entry(name.to_string()).or_insert(0);
            *entry += delta;
            *entry
        };

        if name == INGRESS_STREAM_COUNT {
            observability::record_ingress_streams(value.max(0) as usize);
        }
    }
}

impl HealthRegistrar for GaugeHealthRegistrar {
    fn inc(&self, name: &str) {
        self.update(name, 1);
    }

    fn dec(&self, name: &str) {
        self.update(name, -1);
    }

    fn get(&self, name: &str) -> i64 {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
            .unwrap_or(0)
    }
}

/// 计数守卫：创建时加一，释放时减一
///
/// 流以错误结束或任务被取消时计数也会恢复。
pub struct StreamGuard {
    registrar: Arc<dyn HealthRegistrar>,
    name: &'static str,
}

impl StreamGuard {
    /// 对 `name` 计数加一并返回守卫
    pub fn new(registrar: Arc<dyn HealthRegistrar>, name: &'static str) -> Self {
        registrar.inc(name);
        Self { registrar, name }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.registrar.dec(self.name);
    }
}
