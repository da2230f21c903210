//! Router error types
//!
//! Routing itself never fails observably; these cover building the setters
//! that consumers register.

use thiserror::Error;

/// Router-side errors
#[derive(Debug, Error)]
pub enum RouterError {
    /// Setter creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Subscription names a sink that was never created
    #[error("subscription references unknown sink '{name}'")]
    UnknownSink { name: String },

    /// Sink write error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RouterError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
