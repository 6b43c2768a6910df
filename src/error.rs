//! Error type shared by the statistical core and the request adapter.
//!
//! The `Display` text of every variant is a complete, human-readable
//! sentence. The request adapter places it verbatim into the `errors`
//! list of a response.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving parameters or evaluating the model.
#[derive(Error, Debug)]
pub enum UncertaintyError {
    /// A domain precondition of the math core was violated
    /// (non-positive sigma, CI level outside `(0, 1)`, ...).
    #[error("{0}")]
    InvalidParameter(String),

    /// The variability defaults document is malformed.
    #[error("{0}")]
    Schema(String),

    /// No usable sigma source exists for the requested context/method.
    #[error("{0}")]
    MissingParameter(String),

    /// The requested scenario context is not recognized.
    #[error("Invalid context selection.")]
    InvalidContext(String),

    #[error("Failed to read defaults document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UncertaintyError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        UncertaintyError::InvalidParameter(msg.into())
    }

    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        UncertaintyError::Schema(msg.into())
    }

    pub(crate) fn missing(msg: impl Into<String>) -> Self {
        UncertaintyError::MissingParameter(msg.into())
    }
}

/// Result type for model and defaults operations.
pub type Result<T> = std::result::Result<T, UncertaintyError>;
