//! Scenario harness: a device with on-disk state talking to a fake server.
//!
//! The server is a [`MockTransport`] shared between devices. A device keeps
//! its queue and conflicts in a SQLite file inside a temp directory, so it can
//! be "restarted" by dropping and reopening the store.

use std::path::PathBuf;
use std::sync::Arc;
use sync_client::{
    ClientError, ConflictStore, MockTransport, PendingActionQueue, RecordingNotifier,
    SyncOrchestrator,
};
use sync_core::AutoResolutionPreferences;
use sync_store::{SqliteStore, StorageError};
use tempfile::TempDir;
use thiserror::Error;

/// Errors that can occur during harness operations.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Local store failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Client operation failure.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// General I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A device under test.
pub struct Device {
    /// Temp directory holding the database; removed on drop.
    dir: TempDir,
    /// Shared fake server.
    server: MockTransport,
    /// Preferences applied on every (re)open.
    preferences: AutoResolutionPreferences,
    /// Receives every recorded conflict.
    notifier: RecordingNotifier,
    /// Current session.
    sync: SyncOrchestrator<MockTransport>,
    /// Number of times the device was opened.
    launches: usize,
}

impl Device {
    /// Create a device with default preferences.
    pub async fn new(server: MockTransport) -> Result<Self, HarnessError> {
        Self::with_preferences(server, AutoResolutionPreferences::default()).await
    }

    /// Create a device with the given auto-resolution preferences.
    pub async fn with_preferences(
        server: MockTransport,
        preferences: AutoResolutionPreferences,
    ) -> Result<Self, HarnessError> {
        let dir = tempfile::tempdir()?;
        let notifier = RecordingNotifier::new();
        let sync = open(&dir, &server, preferences, &notifier).await?;
        tracing::debug!(path = %dir.path().display(), "device created");
        Ok(Self {
            dir,
            server,
            preferences,
            notifier,
            sync,
            launches: 1,
        })
    }

    /// Simulate an app restart: drop the session and reopen from disk.
    pub async fn restart(&mut self) -> Result<(), HarnessError> {
        self.sync = open(&self.dir, &self.server, self.preferences, &self.notifier).await?;
        self.launches += 1;
        Ok(())
    }

    /// Current session.
    pub fn sync(&self) -> &SyncOrchestrator<MockTransport> {
        &self.sync
    }

    /// The pending action queue.
    pub fn queue(&self) -> &PendingActionQueue {
        self.sync.queue()
    }

    /// The conflict store.
    pub fn conflicts(&self) -> &ConflictStore {
        self.sync.conflicts()
    }

    /// The shared server.
    pub fn server(&self) -> &MockTransport {
        &self.server
    }

    /// Conflicts reported to the notifier so far.
    pub fn notifier(&self) -> &RecordingNotifier {
        &self.notifier
    }

    /// How many times the device was opened.
    pub fn launches(&self) -> usize {
        self.launches
    }

    /// Path of the device database.
    pub fn database(&self) -> PathBuf {
        database_path(&self.dir)
    }
}

fn database_path(dir: &TempDir) -> PathBuf {
    dir.path().join("carelog.db")
}

async fn open(
    dir: &TempDir,
    server: &MockTransport,
    preferences: AutoResolutionPreferences,
    notifier: &RecordingNotifier,
) -> Result<SyncOrchestrator<MockTransport>, HarnessError> {
    let store = Arc::new(SqliteStore::open(&database_path(dir)).await?);
    Ok(SyncOrchestrator::new(
        PendingActionQueue::new(store.clone()),
        ConflictStore::new(store),
        server.clone(),
    )
    .with_preferences(Arc::new(preferences))
    .with_notifier(Arc::new(notifier.clone())))
}
