//! Error types for the resource watcher.

use std::path::PathBuf;

use thiserror::Error;

use crate::registry::ResourceHandle;

/// Result type alias for resource watcher operations.
pub type Result<T> = std::result::Result<T, ReloadError>;

/// Error returned by a reload action.
pub type ActionError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result returned by a reload action.
pub type ActionResult = std::result::Result<(), ActionError>;

/// Errors that can occur in the resource watcher.
#[derive(Error, Debug)]
pub enum ReloadError {
    /// File could not be resolved or does not exist.
    #[error("resource not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Modification time of a registered file could not be read.
    #[error("failed to read metadata of {}: {source}", path.display())]
    MetadataRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A reload action reported a failure.
    #[error("reload action for {} failed: {message}", path.display())]
    Callback { path: PathBuf, message: String },

    /// Handle does not belong to a registered resource.
    #[error("unknown resource handle: {0}")]
    UnknownHandle(ResourceHandle),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
