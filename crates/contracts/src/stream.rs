//! Envelope streams - Ingestion input interfaces
//!
//! One connected producer is one stream. Single-envelope and batch framings are
//! separate traits so the ingress server can count and validate each item.

use crate::{ContractError, Envelope};

/// Stream yielding one envelope per receive
#[trait_variant::make(EnvelopeStream: Send)]
pub trait LocalEnvelopeStream {
    /// Receive the next envelope
    ///
    /// `Ok(None)` marks end of stream.
    ///
    /// # Errors
    /// A receive error terminates the stream
    async fn recv(&mut self) -> Result<Option<Envelope>, ContractError>;
}

/// Stream yielding envelope batches
#[trait_variant::make(BatchStream: Send)]
pub trait LocalBatchStream {
    /// Receive the next batch
    ///
    /// `Ok(None)` marks end of stream.
    ///
    /// # Errors
    /// A receive error terminates the stream
    async fn recv(&mut self) -> Result<Option<Vec<Envelope>>, ContractError>;
}
