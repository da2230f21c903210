//! Error types for CLI operations.

use std::path::Path;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Input source could not be opened
    #[error("Failed to open input {path}: {message}")]
    InputOpen { path: String, message: String },

    /// Pipeline execution error
    #[error("Pipeline execution failed: {message}")]
    PipelineExecution { message: String },
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn input_open(path: &Path, message: impl Into<String>) -> Self {
        Self::InputOpen {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    pub fn pipeline_execution(message: impl Into<String>) -> Self {
        Self::PipelineExecution {
            message: message.into(),
        }
    }
}

/// Fail with [`CliError::ConfigNotFound`] when `path` does not exist
pub fn ensure_config_exists(path: &Path) -> Result<(), CliError> {
    if path.exists() {
        Ok(())
    } else {
        Err(CliError::config_not_found(path))
    }
}
