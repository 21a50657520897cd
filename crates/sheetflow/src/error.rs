//! Error types for sheetflow

use sheetflow_http::{redact_secrets, HttpError};
use thiserror::Error;

/// Result type alias for sheetflow operations
pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// Unified error type for a write session
#[derive(Error, Debug)]
pub enum SinkError {
    /// Fatal, never retried: bad URL, unknown mode or auth method, bad offsets
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Spool storage could not be allocated
    #[error("Resource error: {0}")]
    Resource(String),

    /// I/O failure while writing or reading the spool
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A spool entry failed its length, checksum or tag check
    #[error("Corrupted write buffer at byte {position}: {reason}")]
    CorruptedBuffer { position: u64, reason: String },

    /// Transport failure talking to the remote resource
    #[error("Remote call failed: {0}")]
    Http(#[from] HttpError),

    /// The remote resource answered with a non-success status
    #[error("Remote call failed with status {status}: {message}")]
    Remote { status: u16, message: String },

    /// Illegal spreadsheet writer transition
    #[error("Cannot {action} while writer is {from}")]
    InvalidState { from: String, action: &'static str },

    /// Input row does not match the schema
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl SinkError {
    /// Returns true for failures of clear/update/append/get-values calls
    pub fn is_remote(&self) -> bool {
        matches!(self, SinkError::Http(_) | SinkError::Remote { .. })
    }

    /// Returns true for errors that abort a session before any network call
    pub fn is_configuration(&self) -> bool {
        matches!(self, SinkError::Configuration(_))
    }

    /// Display text with tokens and secrets removed, for logs
    pub fn redacted(&self) -> String {
        redact_secrets(&self.to_string())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SinkError::Configuration(msg.into())
    }
}
