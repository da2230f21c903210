//! Envelope - Ingestion output, Router input
//!
//! A single telemetry record with provenance metadata and an event payload.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ContractError;

/// Telemetry envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Component that emitted the record (e.g. "cell-agent")
    pub origin: String,

    /// Deployment name
    #[serde(default)]
    pub deployment: String,

    /// Job name within the deployment
    #[serde(default)]
    pub job: String,

    /// Instance index, kept in string form
    #[serde(default)]
    pub index: String,

    /// Emitting host IP
    #[serde(default)]
    pub ip: String,

    /// Owning application id (empty when the record belongs to no application)
    #[serde(default)]
    pub source_id: String,

    /// Emission time, nanoseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: i64,

    /// Free-form tags
    #[serde(default)]
    pub tags: HashMap<String, String>,

    /// Event payload; `None` marks an invalid envelope
    #[serde(default)]
    pub event: Option<EnvelopeEvent>,
}

/// Event payload carried by an envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeEvent {
    Log(LogMessage),
    Counter(CounterEvent),
    Gauge(ValueMetric),
}

/// Log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    pub payload: Bytes,
    #[serde(default)]
    pub message_type: LogType,
}

/// Log stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
    #[default]
    Out,
    Err,
}

/// Monotonic counter sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterEvent {
    pub name: String,
    pub delta: u64,
    pub total: u64,
}

/// Point-in-time metric sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueMetric {
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
}

/// Read-only view the router needs from an envelope.
///
/// Provenance accessors feed shard selection; `is_log` decides the filter
/// category; `marshal` produces the bytes handed to consumers.
pub trait RoutableEnvelope {
    fn origin(&self) -> &str;
    fn deployment(&self) -> &str;
    fn job(&self) -> &str;
    fn index(&self) -> &str;
    fn ip(&self) -> &str;

    /// Whether this is a log record. Everything else routes as a metric.
    fn is_log(&self) -> bool;

    /// Canonical serialized form
    ///
    /// # Errors
    /// Returns `ContractError::Marshal` when the envelope cannot be encoded
    fn marshal(&self) -> Result<Bytes, ContractError>;
}

impl Envelope {
    /// Create a log envelope
    pub fn log(
        origin: impl Into<String>,
        source_id: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            origin: origin.into(),
            source_id: source_id.into(),
            event: Some(EnvelopeEvent::Log(LogMessage {
                payload: payload.into(),
                message_type: LogType::Out,
            })),
            ..Default::default()
        }
    }

    /// Create a counter envelope
    pub fn counter(
        origin: impl Into<String>,
        name: impl Into<String>,
        delta: u64,
        total: u64,
    ) -> Self {
        Self {
            origin: origin.into(),
            event: Some(EnvelopeEvent::Counter(CounterEvent {
                name: name.into(),
                delta,
                total,
            })),
            ..Default::default()
        }
    }

    /// Create a gauge envelope
    pub fn gauge(
        origin: impl Into<String>,
        name: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            event: Some(EnvelopeEvent::Gauge(ValueMetric {
                name: name.into(),
                value,
                unit: unit.into(),
            })),
            ..Default::default()
        }
    }

    /// Set provenance fields (builder style)
    pub fn with_provenance(
        mut self,
        deployment: impl Into<String>,
        job: impl Into<String>,
        index: impl Into<String>,
        ip: impl Into<String>,
    ) -> Self {
        self.deployment = deployment.into();
        self.job = job.into();
        self.index = index.into();
        self.ip = ip.into();
        self
    }

    /// Set the owning application id (builder style)
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = source_id.into();
        self
    }

    /// An envelope without an event carries nothing routable
    pub fn is_valid(&self) -> bool {
        self.event.is_some()
    }

    /// Short event kind label (used for logging/metrics)
    pub fn kind(&self) -> &'static str {
        match &self.event {
            Some(EnvelopeEvent::Log(_)) => "log",
            Some(EnvelopeEvent::Counter(_)) => "counter",
            Some(EnvelopeEvent::Gauge(_)) => "gauge",
            None => "none",
        }
    }

    /// Decode bytes produced by `marshal`
    pub fn unmarshal(data: &[u8]) -> Result<Self, ContractError> {
        bincode::deserialize(data).map_err(|e| ContractError::Marshal {
            message: format!("bincode decode error: {e}"),
        })
    }
}

impl RoutableEnvelope for Envelope {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn deployment(&self) -> &str {
        &self.deployment
    }

    fn job(&self) -> &str {
        &self.job
    }

    fn index(&self) -> &str {
        &self.index
    }

    fn ip(&self) -> &str {
        &self.ip
    }

    fn is_log(&self) -> bool {
        matches!(self.event, Some(EnvelopeEvent::Log(_)))
    }

    fn marshal(&self) -> Result<Bytes, ContractError> {
        bincode::serialize(self)
            .map(Bytes::from)
            .map_err(|e| ContractError::Marshal {
                message: format!("bincode encode error: {e}"),
            })
    }
}
