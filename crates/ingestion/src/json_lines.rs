//! JSON lines envelope source
//!
//! One JSON object per line is one envelope; a line holding a JSON array is a
//! batch and its envelopes are yielded in order. Blank lines and lines starting
//! with `#` are skipped. A malformed line is logged, counted and skipped.

use std::collections::VecDeque;
use std::path::Path;

use contracts::{ContractError, Envelope, EnvelopeStream};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, warn};

use crate::error::IngestionError;

/// Envelope stream over any buffered async reader
pub struct JsonLinesStream<R> {
    name: String,
    lines: Lines<R>,
    line_no: u64,
    pending: VecDeque<Envelope>,
    parse_errors: u64,
}

impl<R: AsyncBufRead + Unpin> JsonLinesStream<R> {
    /// Wrap a reader
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            lines: reader.lines(),
            line_no: 0,
            pending: VecDeque::new(),
            parse_errors: 0,
        }
    }

    /// Stream name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lines skipped because they did not parse
    pub fn parse_errors(&self) -> u64 {
        self.parse_errors
    }

    fn parse_line(&self, line: &str) -> Result<Vec<Envelope>, IngestionError> {
        let parsed = if line.starts_with('[') {
            serde_json::from_str::<Vec<Envelope>>(line)
        } else {
            serde_json::from_str::<Envelope>(line).map(|envelope| vec![envelope])
        };

        parsed.map_err(|e| IngestionError::ParseFailed {
            stream: self.name.clone(),
            line: self.line_no,
            message: e.to_string(),
        })
    }
}

impl JsonLinesStream<BufReader<File>> {
    /// Open a JSON lines file
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).await?;
        debug!(path = %path.display(), "json lines source opened");
        Ok(Self::new(path.display().to_string(), BufReader::new(file)))
    }
}

impl JsonLinesStream<BufReader<Stdin>> {
    /// Read JSON lines from standard input
    pub fn stdin() -> Self {
        Self::new("stdin", BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> EnvelopeStream for JsonLinesStream<R> {
    async fn recv(&mut self) -> Result<Option<Envelope>, ContractError> {
        loop {
            if let Some(envelope) = self.pending.pop_front() {
                return Ok(Some(envelope));
            }

            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| ContractError::stream_recv(&self.name, e.to_string()))?;
            let Some(line) = line else {
                return Ok(None);
            };
            self.line_no += 1;

            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match self.parse_line(line) {
                Ok(envelopes) => self.pending.extend(envelopes),
                Err(e) => {
                    self.parse_errors += 1;
                    warn!(stream = %self.name, error = %e, "skipping malformed line");
                }
            }
        }
    }
}
