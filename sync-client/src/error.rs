//! Error types for sync-client.

use sync_store::StorageError;
use sync_types::ValidationError;
use thiserror::Error;

use crate::transport::TransportError;

/// Client errors.
///
/// Conflicts are not errors; they are reported as data in
/// [`SyncResult`](crate::SyncResult) and the conflict store.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Local store failure. Fatal to the calling operation.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Network or server failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Malformed action rejected before persistence.
    #[error("invalid action: {0}")]
    Validation(#[from] ValidationError),

    /// Referenced item does not exist.
    #[error("{what} not found: {id}")]
    NotFound {
        /// Kind of item.
        what: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// Another sync run holds the queue.
    #[error("a sync run is already in progress")]
    SyncInProgress,
}

impl ClientError {
    pub(crate) fn action_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            what: "pending action",
            id: id.to_string(),
        }
    }

    pub(crate) fn conflict_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            what: "conflict",
            id: id.to_string(),
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
