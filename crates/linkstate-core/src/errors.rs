//! Unified error type for link store operations
//!
//! Stale mutations and unknown links are not errors: the store reports them as
//! `Ok(None)` / `None`. The variants below cover caller misuse and failures of
//! external collaborators.

use crate::config::ValidationError;
use crate::effects::{ClockError, MessagingError};
use crate::serialization::SerializationError;

/// Unified error type for link store operations
#[derive(Debug, thiserror::Error)]
pub enum LinkStoreError {
    /// Malformed description supplied by a local provider
    #[error("Invalid link description: {reason}")]
    InvalidDescription {
        /// Why the description was rejected
        reason: String,
    },

    /// Timestamp could not be obtained
    #[error("Clock error: {0}")]
    Clock(#[from] ClockError),

    /// Cluster messaging failed
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },

    /// The store has been stopped
    #[error("Link store is not running")]
    NotRunning,
}

impl LinkStoreError {
    /// Create an invalid description error
    pub fn invalid_description(reason: impl Into<String>) -> Self {
        Self::InvalidDescription {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<ValidationError> for LinkStoreError {
    fn from(err: ValidationError) -> Self {
        LinkStoreError::config(err.to_string())
    }
}

/// Standard result type for link store operations
pub type LinkStoreResult<T> = Result<T, LinkStoreError>;
