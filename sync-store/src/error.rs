//! Error types for sync-store.

use std::path::PathBuf;
use sync_types::CodecError;

/// Storage layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored bytes could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The collection has no secondary index with this name.
    ///
    /// Callers degrade to a full scan rather than failing.
    #[error("index {index} unavailable on collection {collection}")]
    IndexUnavailable {
        /// Collection queried.
        collection: String,
        /// Missing index.
        index: String,
    },

    /// Backend refused the operation.
    #[error("storage backend unavailable: {reason}")]
    Unavailable {
        /// Why the backend refused.
        reason: String,
    },

    /// Database path error.
    #[error("invalid database path: {path}")]
    InvalidPath {
        /// The invalid path.
        path: PathBuf,
    },
}

impl StorageError {
    /// Whether a caller should fall back to a full scan.
    pub fn is_index_unavailable(&self) -> bool {
        matches!(self, Self::IndexUnavailable { .. })
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
