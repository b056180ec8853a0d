//! Error types for the triad engine.

use thiserror::Error;

/// Main error type for triad engine operations.
#[derive(Error, Debug, Clone)]
pub enum TriadError {
    /// A call received a configuration parameter outside its valid range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Entity not found in the interaction field
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type alias for triad engine operations.
pub type Result<T> = std::result::Result<T, TriadError>;

impl TriadError {
    /// Check if this error is caller-recoverable by re-supplying valid input
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TriadError::InvalidConfig(_) | TriadError::UnknownEntity(_)
        )
    }
}
