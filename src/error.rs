//! Error types for network construction and configuration loading
//!
//! Only construction-time problems are reported through [`Error`]. Misuse of a
//! built network (out-of-range class indices, mismatched target lengths,
//! unsupported operations) is a caller bug and panics with a descriptive message.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while assembling a network or trainer.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for the expected structure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The layer definition list as a whole is malformed.
    #[error("Invalid network definition: {0}")]
    Definition(String),

    /// A single layer definition is malformed.
    #[error("Layer {index}: {message}")]
    Layer { index: usize, message: String },

    /// Trainer hyperparameters are out of range.
    #[error("Invalid trainer options: {0}")]
    Options(String),
}

impl Error {
    pub(crate) fn definition(message: impl Into<String>) -> Self {
        Error::Definition(message.into())
    }

    pub(crate) fn layer(index: usize, message: impl Into<String>) -> Self {
        Error::Layer {
            index,
            message: message.into(),
        }
    }

    pub(crate) fn options(message: impl Into<String>) -> Self {
        Error::Options(message.into())
    }
}
