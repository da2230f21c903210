//! DataSetter / EnvelopeWriter - Router output interfaces

use bytes::Bytes;

use crate::ContractError;

/// Consumer-side sink for serialized envelopes
///
/// The router calls `set` from dispatch threads and never observes the
/// outcome. Buffering, backpressure and failure handling belong to the
/// implementation; `set` should not block for long.
pub trait DataSetter: Send + Sync {
    /// Accept one serialized envelope
    fn set(&self, data: Bytes);
}

impl<F> DataSetter for F
where
    F: Fn(Bytes) + Send + Sync,
{
    fn set(&self, data: Bytes) {
        self(data)
    }
}

/// Asynchronous envelope writer
///
/// Drained by a buffered setter's worker task; all writer implementations
/// must implement this trait.
#[trait_variant::make(EnvelopeWriter: Send)]
pub trait LocalEnvelopeWriter {
    /// Writer name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one serialized envelope
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, data: &Bytes) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close writer
    async fn close(&mut self) -> Result<(), ContractError>;
}
