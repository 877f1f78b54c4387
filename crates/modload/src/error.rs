//! Error types for modload
//!
//! User-facing errors with messages that say what went wrong and how to fix
//! it. Everything here is fatal for the run except [`ImportError::Reset`],
//! which the importer downgrades to a warning.

use modload_common::types::CollectionPath;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Error type for every modload operation
#[derive(Error, Debug)]
pub enum ImportError {
    /// Service account key file is missing
    #[error("Credential file not found: '{}'. Download a service account key or point --credentials (GOOGLE_APPLICATION_CREDENTIALS) at it.", .0.display())]
    CredentialsNotFound(PathBuf),

    /// Service account key file could not be used
    #[error("Invalid credential file '{}': {reason}", .path.display())]
    InvalidCredentials { path: PathBuf, reason: String },

    /// Required fixture file is missing
    #[error("Fixture file not found: '{}'. Check --fixtures-dir (MODLOAD_FIXTURES_DIR).", .0.display())]
    FixtureNotFound(PathBuf),

    /// Fixture file is not a valid JSON array
    #[error("Failed to parse fixture '{}': {source}. Fixture files must contain a JSON array.", .path.display())]
    FixtureParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A record cannot be addressed or stored
    #[error("Invalid record in '{dataset}': {reason}")]
    InvalidRecord { dataset: String, reason: String },

    /// Clearing a collection failed
    #[error("Failed to reset collection '{collection}': {source}")]
    Reset {
        collection: CollectionPath,
        #[source]
        source: Box<ImportError>,
    },

    /// A batch exceeded the backend's per-commit operation limit
    #[error("Write batch has {0} operations; the limit is {limit}", limit = crate::store::MAX_BATCH_OPS)]
    BatchTooLarge(usize),

    /// The storage backend rejected a request
    #[error("Storage error: {0}")]
    Storage(String),

    /// OAuth token exchange failed
    #[error("Authentication failed: {0}. Check that the service account is enabled and has Firestore access.")]
    Auth(String),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables and command-line flags.")]
    Config(String),

    /// Path construction failed
    #[error(transparent)]
    Path(#[from] modload_common::CommonError),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions.")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("Network request failed: {0}. Check your internet connection or emulator host.")]
    Http(#[from] reqwest::Error),

    /// JWT signing failed
    #[error("Failed to sign access token request: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// JSON encoding/decoding failed outside fixture parsing
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid record error
    pub fn invalid_record(dataset: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            dataset: dataset.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an error raised while resetting `collection`
    pub fn reset(collection: CollectionPath, source: ImportError) -> Self {
        Self::Reset {
            collection,
            source: Box::new(source),
        }
    }
}
