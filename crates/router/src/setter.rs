//! Buffered setter - isolates a slow writer behind a bounded queue
//!
//! `set` never waits: data goes into a bounded channel drained by a dedicated
//! worker task, and is dropped (and counted) when the queue is full.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace};

use contracts::{DataSetter, EnvelopeWriter};

use crate::metrics::SetterMetrics;

/// Sending side of a buffered writer, registered with the router
pub struct BufferedSetter {
    name: String,
    tx: mpsc::Sender<Bytes>,
    metrics: Arc<SetterMetrics>,
}

impl BufferedSetter {
    /// Writer name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue metrics
    pub fn metrics(&self) -> &Arc<SetterMetrics> {
        &self.metrics
    }

    /// Enqueue without waiting; returns false when the data was dropped
    pub fn try_send(&self, data: Bytes) -> bool {
        match self.tx.try_send(data) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(data)) => {
                self.metrics.inc_dropped_count();
                observability::record_setter_dropped(&self.name);
                trace!(sink = %self.name, bytes = data.len(), "Queue full, envelope dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.metrics.inc_dropped_count();
                debug!(sink = %self.name, "Setter closed, envelope dropped");
                false
            }
        }
    }
}

impl DataSetter for BufferedSetter {
    fn set(&self, data: Bytes) {
        self.try_send(data);
    }
}

/// Owner of a buffered setter's worker task
pub struct SetterHandle {
    setter: Arc<BufferedSetter>,
    shutdown_tx: oneshot::Sender<()>,
    worker_handle: JoinHandle<()>,
}

impl SetterHandle {
    /// Spawn a worker draining into `writer` and return its handle
    pub fn spawn<W: EnvelopeWriter + Send + 'static>(writer: W, queue_capacity: usize) -> Self {
        let name = writer.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let metrics = Arc::new(SetterMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();
        let worker_handle = tokio::spawn(async move {
            setter_worker(writer, rx, shutdown_rx, worker_metrics, worker_name).await;
        });

        Self {
            setter: Arc::new(BufferedSetter { name, tx, metrics }),
            shutdown_tx,
            worker_handle,
        }
    }

    /// Writer name
    pub fn name(&self) -> &str {
        self.setter.name()
    }

    /// Queue metrics
    pub fn metrics(&self) -> &Arc<SetterMetrics> {
        self.setter.metrics()
    }

    /// Setter to register with the router
    pub fn setter(&self) -> Arc<BufferedSetter> {
        Arc::clone(&self.setter)
    }

    /// Stop accepting data, drain what is queued, then flush and close the writer
    ///
    /// Works even while the router still holds clones of the setter; anything
    /// they send afterwards is dropped.
    #[instrument(name = "setter_handle_shutdown", skip(self), fields(sink = %self.setter.name))]
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.setter.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.setter.name, "SetterHandle shutdown complete");
    }
}

#[instrument(
    name = "setter_worker_loop",
    skip(writer, rx, shutdown_rx, metrics),
    fields(sink = %name)
)]
async fn setter_worker<W: EnvelopeWriter>(
    mut writer: W,
    mut rx: mpsc::Receiver<Bytes>,
    mut shutdown_rx: oneshot::Receiver<()>,
    metrics: Arc<SetterMetrics>,
    name: String,
) {
    debug!(sink = %name, "Setter worker started");

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(data) => write_one(&mut writer, &data, &metrics, &name, rx.len()).await,
                None => break,
            },
            _ = &mut shutdown_rx => {
                rx.close();
                while let Some(data) = rx.recv().await {
                    write_one(&mut writer, &data, &metrics, &name, rx.len()).await;
                }
                break;
            }
        }
    }

    if let Err(e) = writer.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = writer.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Setter worker stopped");
}

async fn write_one<W: EnvelopeWriter>(
    writer: &mut W,
    data: &Bytes,
    metrics: &SetterMetrics,
    name: &str,
    backlog: usize,
) {
    metrics.set_queue_len(backlog);

    match writer.write(data).await {
        Ok(()) => {
            metrics.inc_write_count();
            observability::record_setter_write(name, true);
        }
        Err(e) => {
            // A failed write never stops the worker
            metrics.inc_failure_count();
            observability::record_setter_write(name, false);
            error!(sink = %name, bytes = data.len(), error = %e, "Write failed");
        }
    }
}
