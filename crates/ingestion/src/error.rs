//! Ingestion error types
//!
//! These describe why a single record was rejected. They never cross the
//! engine boundary; callers count them into `DecodeStats` instead.

use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Record timestamp could not be parsed as a session time
    #[error("invalid session time '{value}'")]
    InvalidClock {
        /// The offending text
        value: String,
    },

    /// Record shorter than the fixed timestamp prefix
    #[error("record too short: {len} bytes")]
    TruncatedRecord {
        /// Record length in bytes
        len: usize,
    },

    /// Payload could not be decoded (base64, deflate or JSON)
    #[error("failed to decode payload: {message}")]
    Decode {
        /// Error message
        message: String,
    },

    /// Payload decoded but did not have the expected shape
    #[error("unexpected payload structure: {message}")]
    Structure {
        /// Error message
        message: String,
    },
}

impl IngestionError {
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn structure(message: impl Into<String>) -> Self {
        Self::Structure {
            message: message.into(),
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
