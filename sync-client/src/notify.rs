//! Out-of-band alerts for newly recorded conflicts.
//!
//! Notification runs as its own task after the conflict is committed. Its
//! failures are logged and never reach the caller.

use async_trait::async_trait;
use std::sync::Arc;
use sync_types::ConflictEntry;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a notification could not be delivered.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The delivery channel could not be reached.
    #[error("notification channel unavailable: {0}")]
    Unavailable(String),
}

/// Receives newly recorded conflicts.
#[async_trait]
pub trait ConflictNotifier: Send + Sync {
    /// Alert the user about a conflict.
    async fn conflict_created(&self, conflict: &ConflictEntry) -> Result<(), NotifyError>;
}

/// Hand a committed conflict to the notifier on a separate task.
pub fn dispatch(
    notifier: Arc<dyn ConflictNotifier>,
    conflict: ConflictEntry,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match notifier.conflict_created(&conflict).await {
            Ok(()) => debug!(conflict_id = %conflict.id, "conflict notification sent"),
            Err(error) => warn!(conflict_id = %conflict.id, %error, "conflict notification failed"),
        }
    })
}

/// Notifier that collects conflicts in memory (for testing).
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    seen: Arc<std::sync::Mutex<Vec<ConflictEntry>>>,
    fail: bool,
}

impl RecordingNotifier {
    /// A notifier that accepts every conflict.
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier that records then fails every call.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Conflicts seen so far.
    pub fn seen(&self) -> Vec<ConflictEntry> {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ConflictNotifier for RecordingNotifier {
    async fn conflict_created(&self, conflict: &ConflictEntry) -> Result<(), NotifyError> {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(conflict.clone());
        if self.fail {
            Err(NotifyError::Unavailable("push service".into()))
        } else {
            Ok(())
        }
    }
}
