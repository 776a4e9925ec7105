//! Error types for storage operations

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by the storage adapter and its backends
#[derive(Debug, Error)]
pub enum StorageError {
    /// Invalid adapter configuration, fails construction
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend reported the object as missing
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Any other failure talking to the object store
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A backend call did not complete in time
    #[error("Storage backend did not respond within {0:?}")]
    Timeout(Duration),

    /// The uploaded temporary file could not be read
    #[error("Failed to read upload from '{}': {source}", .path.display())]
    LocalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Whether the error came from the remote backend rather than local state
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            StorageError::NotFound(_) | StorageError::Backend(_) | StorageError::Timeout(_)
        )
    }
}
