//! LogWriter - logs envelope summaries via tracing

use bytes::Bytes;
use contracts::{ContractError, Envelope, EnvelopeWriter};
use tracing::{info, instrument, warn};

/// Writer that logs a one-line summary per envelope
pub struct LogWriter {
    name: String,
}

impl LogWriter {
    /// Create a new LogWriter with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_summary(&self, data: &Bytes) {
        match Envelope::unmarshal(data) {
            Ok(envelope) => info!(
                sink = %self.name,
                kind = envelope.kind(),
                source_id = %envelope.source_id,
                origin = %envelope.origin,
                job = %envelope.job,
                index = %envelope.index,
                bytes = data.len(),
                "Envelope received"
            ),
            Err(e) => warn!(
                sink = %self.name,
                bytes = data.len(),
                error = %e,
                "Undecodable envelope received"
            ),
        }
    }
}

impl EnvelopeWriter for LogWriter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_writer_write", skip(self, data), fields(sink = %self.name))]
    async fn write(&mut self, data: &Bytes) -> Result<(), ContractError> {
        self.log_summary(data);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_writer_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogWriter closed");
        Ok(())
    }
}
