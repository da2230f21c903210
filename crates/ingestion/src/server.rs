//! Ingress server main entry

use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use contracts::{BatchStream, Envelope, EnvelopeStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::{IngestionMetrics, IngressConfig};
use crate::error::{IngestionError, Result};
use crate::health::{GaugeHealthRegistrar, HealthRegistrar, StreamGuard, INGRESS_STREAM_COUNT};

/// Ingress server
///
/// Consumes envelope streams and writes every valid envelope into one bounded
/// buffer. The buffer is lossy: when it is full the envelope is dropped and
/// counted, so a stalled router never blocks producers.
pub struct IngressServer {
    /// Data sender (shared by all streams)
    tx: Sender<Envelope>,

    /// Data receiver
    rx: Option<Receiver<Envelope>>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,

    /// Open stream accounting
    health: Arc<dyn HealthRegistrar>,
}

impl IngressServer {
    /// Create new ingress server
    ///
    /// # Arguments
    /// * `buffer_capacity` - Ingress buffer capacity
    pub fn new(buffer_capacity: usize) -> Self {
        Self::with_config(
            IngressConfig::new(buffer_capacity),
            Arc::new(GaugeHealthRegistrar::new()),
        )
    }

    /// Create with custom configuration and health registrar
    pub fn with_config(config: IngressConfig, health: Arc<dyn HealthRegistrar>) -> Self {
        let (tx, rx) = bounded(config.buffer_capacity.max(1));

        Self {
            tx,
            rx: Some(rx),
            metrics: Arc::new(IngestionMetrics::new()),
            health,
        }
    }

    /// Consume a single-envelope stream until it ends
    ///
    /// Returns the number of envelopes read. The stream counts toward
    /// `ingress_stream_count` while it is being read.
    ///
    /// # Errors
    /// Returns the stream's receive error, or `StreamClosed` once the server
    /// has been closed.
    #[instrument(name = "ingress_sender", skip(self, stream))]
    pub async fn sender<S: EnvelopeStream>(&self, name: &str, mut stream: S) -> Result<u64> {
        let _guard = StreamGuard::new(Arc::clone(&self.health), INGRESS_STREAM_COUNT);
        debug!(stream = name, "ingress stream opened");

        let mut count = 0u64;
        loop {
            match stream.recv().await {
                Ok(Some(envelope)) => {
                    count += 1;
                    self.write(name, envelope)?;
                }
                Ok(None) => break,
                Err(e) => {
                    self.metrics.record_stream_error();
                    warn!(stream = name, error = %e, received = count, "ingress stream failed");
                    return Err(e.into());
                }
            }
        }

        debug!(stream = name, received = count, "ingress stream closed");
        Ok(count)
    }

    /// Consume a batch stream until it ends
    ///
    /// Returns the number of envelopes read across all batches.
    #[instrument(name = "ingress_batch_sender", skip(self, stream))]
    pub async fn batch_sender<S: BatchStream>(&self, name: &str, mut stream: S) -> Result<u64> {
        let _guard = StreamGuard::new(Arc::clone(&self.health), INGRESS_STREAM_COUNT);
        debug!(stream = name, "ingress batch stream opened");

        let mut count = 0u64;
        loop {
            match stream.recv().await {
                Ok(Some(batch)) => {
                    trace!(stream = name, size = batch.len(), "batch received");
                    for envelope in batch {
                        count += 1;
                        self.write(name, envelope)?;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    self.metrics.record_stream_error();
                    warn!(stream = name, error = %e, received = count, "ingress batch stream failed");
                    return Err(e.into());
                }
            }
        }

        debug!(stream = name, received = count, "ingress batch stream closed");
        Ok(count)
    }

    /// Spawn [`Self::sender`] as a background task
    pub fn spawn_sender<S>(self: &Arc<Self>, name: impl Into<String>, stream: S) -> JoinHandle<Result<u64>>
    where
        S: EnvelopeStream + Send + 'static,
    {
        let server = Arc::clone(self);
        let name = name.into();
        tokio::spawn(async move { server.sender(&name, stream).await })
    }

    /// Offer one envelope to the buffer
    ///
    /// Invalid envelopes and envelopes hitting a full buffer are dropped and
    /// counted; neither ends the stream.
    fn write(&self, stream: &str, envelope: Envelope) -> Result<()> {
        self.metrics.record_received();
        observability::record_envelope_received(envelope.kind());

        if !envelope.is_valid() {
            self.metrics.record_invalid();
            observability::record_envelope_invalid();
            debug!(stream, origin = %envelope.origin, "dropping envelope without event");
            return Ok(());
        }

        match self.tx.try_send(envelope) {
            Ok(()) => {
                let len = self.tx.len();
                self.metrics.update_queue_len(len);
                observability::record_ingress_depth(len);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.metrics.record_dropped();
                observability::record_ingress_dropped();
                trace!(stream, "ingress buffer full, envelope dropped");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(IngestionError::StreamClosed {
                stream: stream.to_string(),
            }),
        }
    }

    /// Get the buffer receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<Envelope>> {
        self.rx.take()
    }

    /// Stop accepting envelopes
    ///
    /// Receivers still drain what is buffered, then see the channel end.
    #[instrument(name = "ingress_close", skip(self))]
    pub fn close(&self) {
        if self.tx.close() {
            info!(buffered = self.tx.len(), "ingress closed");
        }
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Get health registrar
    pub fn health(&self) -> &Arc<dyn HealthRegistrar> {
        &self.health
    }
}
