//! Pipeline statistics and metrics.

use std::fmt;
use std::time::Duration;

use ingestion::MetricsSnapshot;
use observability::ThroughputSummary;
use router::{RouterMetricsSnapshot, SetterMetricsSnapshot};

/// Why the run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Source reached end of input or its envelope limit
    Completed,
    /// The run timeout fired
    TimedOut,
    /// A shutdown signal arrived
    Interrupted,
    /// The source task died
    Failed,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Completed => "completed",
            Self::TimedOut => "timed out",
            Self::Interrupted => "interrupted",
            Self::Failed => "source failed",
        };
        f.write_str(label)
    }
}

/// Statistics from a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub outcome: RunOutcome,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of routing workers
    pub workers: usize,

    /// Registrations live while routing
    pub subscriptions: usize,

    /// Envelopes taken off the ingress buffer by workers
    pub routed: u64,

    /// Ingress counters
    pub ingress: MetricsSnapshot,

    /// Router counters
    pub routing: RouterMetricsSnapshot,

    /// Per-sink counters after draining
    pub setters: Vec<(String, SetterMetricsSnapshot)>,

    /// Sampled dispatch throughput
    pub throughput: ThroughputSummary,
}

impl PipelineStats {
    /// Dispatched envelopes per second
    pub fn rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.routing.dispatched as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of received envelopes lost at the ingress buffer, as percentage
    pub fn ingress_drop_rate(&self) -> f64 {
        if self.ingress.envelopes_received > 0 {
            (self.ingress.envelopes_dropped as f64 / self.ingress.envelopes_received as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n================================================================");
        println!("                    Router Statistics");
        println!("================================================================\n");

        println!("Overview");
        println!("   ├─ Outcome: {}", self.outcome);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Rate: {:.2} envelopes/s", self.rate());
        println!("   ├─ Workers: {}", self.workers);
        println!("   └─ Subscriptions: {}", self.subscriptions);

        println!("\nIngress");
        println!("   ├─ Received: {}", self.ingress.envelopes_received);
        println!("   ├─ Invalid: {}", self.ingress.envelopes_invalid);
        println!(
            "   ├─ Dropped (buffer full): {} ({:.2}%)",
            self.ingress.envelopes_dropped,
            self.ingress_drop_rate()
        );
        println!("   └─ Stream errors: {}", self.ingress.stream_errors);

        println!("\nRouting");
        println!("   ├─ Dispatched: {}", self.routing.dispatched);
        println!("   ├─ Unmatched: {}", self.routing.unmatched);
        println!("   ├─ Marshal failures: {}", self.routing.marshal_failures);
        println!("   └─ Deliveries: {}", self.routing.deliveries);

        if !self.setters.is_empty() {
            println!("\nSinks");
            let last = self.setters.len() - 1;
            for (i, (name, m)) in self.setters.iter().enumerate() {
                let branch = if i == last { "└─" } else { "├─" };
                println!(
                    "   {} {}: written {}, failed {}, dropped {}",
                    branch, name, m.write_count, m.failure_count, m.dropped_count
                );
            }
        }

        if self.throughput.samples > 0 {
            println!("\n{}", self.throughput);
        }

        println!();
    }
}
