//! Error types for phishshield

use thiserror::Error;

use crate::types::SessionId;

/// Errors that can occur in the scan gate
#[derive(Debug, Error)]
pub enum GateError {
    /// Session store read/write failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Classifier endpoint failure (swallowed internally, never fatal to a scan)
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Host refused or failed a redirect request
    #[error("Failed to redirect {session}: {reason}")]
    Redirect {
        session: SessionId,
        reason: String,
    },

    /// Gate command channel closed before the operation completed
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for gate operations
pub type Result<T> = std::result::Result<T, GateError>;
