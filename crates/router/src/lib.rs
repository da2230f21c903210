//! # Router
//!
//! 遥测信封路由模块。
//!
//! 负责：
//! - 按 (app_id, 类别) 过滤器登记订阅者
//! - 广播组全员投递，分片组按来源哈希选一个成员
//! - 慢订阅者隔离在有界队列之后，不阻塞路由

pub mod error;
pub mod factory;
pub mod filter;
pub mod metrics;
mod registry;
pub mod router;
pub mod setter;
pub mod shard;
pub mod sinks;
pub mod worker;

pub use contracts::{DataSetter, Envelope, RoutableEnvelope, SubscriptionRequest};
pub use error::RouterError;
pub use factory::{Installation, build_router, create_setter};
pub use filter::{EnvelopeCategory, Filter};
pub use metrics::{RouterMetrics, RouterMetricsSnapshot, SetterMetrics, SetterMetricsSnapshot};
pub use registry::SubscriptionId;
pub use router::{Router, SubscriptionHandle};
pub use setter::{BufferedSetter, SetterHandle};
pub use sinks::{FileWriter, LogWriter, NetworkWriter};
pub use worker::RoutingWorkers;
