//! Error types shared across modload crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Main error type for the common crate
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid path segment '{segment}': {reason}")]
    InvalidPathSegment { segment: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CommonError {
    /// Create an invalid path segment error
    pub fn invalid_segment(segment: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPathSegment {
            segment: segment.into(),
            reason: reason.into(),
        }
    }
}
