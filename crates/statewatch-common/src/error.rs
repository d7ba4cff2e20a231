//! Unified error types for the statewatch workspace.
//!
//! Expected wait outcomes (`TimedOut`, `Cancelled`) and "never published"
//! registry lookups are modeled as values, not errors; only genuine
//! failures travel through this enum.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StatewatchError {
    /// A caller-supplied argument is invalid.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// An internal resource could not be allocated for a wait call.
    #[error("resource exhausted: {message}")]
    ResourceExhausted {
        /// Description of the exhausted resource.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The monitor socket peer violated the wire protocol.
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StatewatchError>;
