//! FileWriter - appends decoded envelopes to a JSON lines file

use bytes::Bytes;
use contracts::{ContractError, Envelope, EnvelopeWriter};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for FileWriter
#[derive(Debug, Clone)]
pub struct FileWriterConfig {
    /// Output file, created along with its parent directories
    pub path: PathBuf,
}

impl FileWriterConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output/envelopes.jsonl"));

        Self { path }
    }
}

/// Writer that persists every envelope as one JSON line
pub struct FileWriter {
    name: String,
    config: FileWriterConfig,
    out: Option<BufWriter<File>>,
}

impl FileWriter {
    /// Create a new FileWriter, opening the file in append mode
    pub fn new(name: impl Into<String>, config: FileWriterConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            config,
            out: Some(BufWriter::new(file)),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, FileWriterConfig::from_params(params))
    }

    fn append(&mut self, data: &Bytes) -> std::io::Result<()> {
        let envelope = Envelope::unmarshal(data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let out = self
            .out
            .as_mut()
            .ok_or_else(|| std::io::Error::other("file already closed"))?;
        serde_json::to_writer(&mut *out, &envelope)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        out.write_all(b"\n")
    }

    fn persist(&mut self, data: &Bytes) -> Result<(), ContractError> {
        self.append(data).map_err(|e| {
            error!(sink = %self.name, path = %self.config.path.display(), error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl EnvelopeWriter for FileWriter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "file_writer_write", skip(self, data), fields(sink = %self.name))]
    async fn write(&mut self, data: &Bytes) -> Result<(), ContractError> {
        self.persist(data)
    }

    #[instrument(name = "file_writer_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(out) = self.out.as_mut() {
            out.flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "file_writer_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush().await?;
        self.out = None;
        debug!(sink = %self.name, "FileWriter closed");
        Ok(())
    }
}
