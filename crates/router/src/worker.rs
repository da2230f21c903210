//! Routing workers - drain the ingress buffer into the router

use std::sync::Arc;

use async_channel::Receiver;
use contracts::Envelope;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::router::Router;

/// Pool of tasks feeding buffered envelopes to [`Router::dispatch`]
///
/// Every worker shares one multi-consumer receiver; the pool stops once the
/// ingress side is closed and drained.
pub struct RoutingWorkers {
    handles: Vec<JoinHandle<u64>>,
}

impl RoutingWorkers {
    /// Spawn `count` workers (at least one)
    pub fn spawn(router: Arc<Router>, rx: Receiver<Envelope>, count: usize) -> Self {
        let count = count.max(1);
        let handles = (0..count)
            .map(|id| {
                let router = Arc::clone(&router);
                let rx = rx.clone();
                tokio::spawn(routing_worker(id, router, rx))
            })
            .collect();

        info!(workers = count, "Routing workers started");
        Self { handles }
    }

    /// Number of workers
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker; returns the number of envelopes routed
    pub async fn join(self) -> u64 {
        let mut total = 0;
        for handle in self.handles {
            match handle.await {
                Ok(routed) => total += routed,
                Err(e) => error!(error = ?e, "Routing worker panicked"),
            }
        }
        total
    }
}

#[instrument(name = "routing_worker_loop", skip(router, rx))]
async fn routing_worker(id: usize, router: Arc<Router>, rx: Receiver<Envelope>) -> u64 {
    let mut routed: u64 = 0;

    while let Ok(envelope) = rx.recv().await {
        router.dispatch(&envelope.source_id, &envelope);
        routed += 1;

        if routed.is_multiple_of(1000) {
            debug!(worker = id, routed, "Routing progress");
        }
    }

    debug!(worker = id, routed, "Routing worker stopped");
    routed
}
