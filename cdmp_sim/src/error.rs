//! Error type for the simulation harness.

use cdmp_core::ModelError;
use thiserror::Error;

/// Errors raised while configuring, running or exporting a scenario.
#[derive(Debug, Error)]
pub enum SimError {
    /// The core rejected an operation
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// The configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Writing an export failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding an export failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
