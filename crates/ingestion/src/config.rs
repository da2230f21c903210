//! Ingress configuration and metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Ingress configuration
#[derive(Debug, Clone)]
pub struct IngressConfig {
    /// Ingress buffer capacity
    pub buffer_capacity: usize,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 1024,
        }
    }
}

impl IngressConfig {
    /// Create new ingress configuration
    pub fn new(buffer_capacity: usize) -> Self {
        Self { buffer_capacity }
    }
}

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Total envelopes received
    pub envelopes_received: AtomicU64,

    /// Envelopes rejected for carrying no event
    pub envelopes_invalid: AtomicU64,

    /// Envelopes dropped on a full buffer
    pub envelopes_dropped: AtomicU64,

    /// Current buffer length
    pub queue_len: AtomicUsize,

    /// Streams that ended with an error
    pub stream_errors: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record envelope received
    pub fn record_received(&self) {
        self.envelopes_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record invalid envelope
    pub fn record_invalid(&self) {
        self.envelopes_invalid.fetch_add(1, Ordering::Relaxed);
    }

    /// Record envelope dropped
    pub fn record_dropped(&self) {
        self.envelopes_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record stream error
    pub fn record_stream_error(&self) {
        self.stream_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Update queue length
    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            envelopes_received: self.envelopes_received.load(Ordering::Relaxed),
            envelopes_invalid: self.envelopes_invalid.load(Ordering::Relaxed),
            envelopes_dropped: self.envelopes_dropped.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
            stream_errors: self.stream_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total envelopes received
    pub envelopes_received: u64,

    /// Envelopes rejected for carrying no event
    pub envelopes_invalid: u64,

    /// Envelopes dropped on a full buffer
    pub envelopes_dropped: u64,

    /// Current buffer length
    pub queue_len: usize,

    /// Streams that ended with an error
    pub stream_errors: u64,
}

impl MetricsSnapshot {
    /// Envelopes that made it into the buffer
    pub fn accepted(&self) -> u64 {
        self.envelopes_received
            .saturating_sub(self.envelopes_invalid)
            .saturating_sub(self.envelopes_dropped)
    }
}
