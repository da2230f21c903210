//! Router and setter metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Routing counters, shared by every dispatching thread
#[derive(Debug, Default)]
pub struct RouterMetrics {
    /// Envelopes passed to dispatch
    dispatched: AtomicU64,
    /// Envelopes that matched no registered consumer
    unmatched: AtomicU64,
    /// Envelopes abandoned because they failed to serialize
    marshal_failures: AtomicU64,
    /// Individual `set` calls made
    deliveries: AtomicU64,
}

impl RouterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn inc_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_unmatched(&self) {
        self.unmatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_marshal_failures(&self) {
        self.marshal_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_deliveries(&self, count: u64) {
        self.deliveries.fetch_add(count, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> RouterMetricsSnapshot {
        RouterMetricsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            unmatched: self.unmatched.load(Ordering::Relaxed),
            marshal_failures: self.marshal_failures.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of router counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterMetricsSnapshot {
    pub dispatched: u64,
    pub unmatched: u64,
    pub marshal_failures: u64,
    pub deliveries: u64,
}

/// Metrics for a single buffered setter
#[derive(Debug, Default)]
pub struct SetterMetrics {
    /// Current queue length
    queue_len: AtomicUsize,
    /// Total successful writes
    write_count: AtomicU64,
    /// Total write failures
    failure_count: AtomicU64,
    /// Total envelopes dropped due to full queue
    dropped_count: AtomicU64,
}

impl SetterMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current queue length
    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    /// Set current queue length
    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get total write count
    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Increment write count
    pub fn inc_write_count(&self) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get failure count
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Increment failure count
    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get dropped count
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    /// Increment dropped count
    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> SetterMetricsSnapshot {
        SetterMetricsSnapshot {
            queue_len: self.queue_len(),
            write_count: self.write_count(),
            failure_count: self.failure_count(),
            dropped_count: self.dropped_count(),
        }
    }
}

/// Snapshot of setter metrics (for reporting)
#[derive(Debug, Clone, Copy, Default)]
pub struct SetterMetricsSnapshot {
    pub queue_len: usize,
    pub write_count: u64,
    pub failure_count: u64,
    pub dropped_count: u64,
}
