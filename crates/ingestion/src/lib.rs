//! # Ingestion
//!
//! Envelope ingress module.
//!
//! Responsibilities:
//! - Consume envelope streams (single and batch framing)
//! - Drop invalid envelopes before they reach the router
//! - Track open streams through a health registrar
//! - Push into a bounded lossy buffer drained by routing workers
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngressServer, JsonLinesStream};
//!
//! let mut server = IngressServer::new(1024);
//! let rx = server.take_receiver().unwrap();
//!
//! let stream = JsonLinesStream::open("envelopes.jsonl").await?;
//! server.sender("file", stream).await?;
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::MockEnvelopeSource;
//!
//! let source = MockEnvelopeSource::with_rate(200.0).limit(1000);
//! server.sender("mock", source).await?;
//! ```

mod config;
mod error;
mod health;
mod json_lines;
mod mock;
mod server;

// Re-exports
pub use config::{IngestionMetrics, IngressConfig, MetricsSnapshot};
pub use contracts::{BatchStream, Envelope, EnvelopeStream};
pub use error::{IngestionError, Result};
pub use health::{GaugeHealthRegistrar, HealthRegistrar, StreamGuard, INGRESS_STREAM_COUNT};
pub use json_lines::JsonLinesStream;
pub use mock::{MockEnvelopeSource, MockSourceConfig};
pub use server::IngressServer;
