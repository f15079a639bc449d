//! # sync-client
//!
//! Offline sync library for carelog.
//!
//! Applications record mutations while offline and replay them once the
//! server is reachable again. Divergent server state is detected, settled
//! automatically when unambiguous, and otherwise kept for the user to
//! decide.
//!
//! ## Features
//!
//! - **Durable Queue**: Pending actions survive restarts (SQLite or memory)
//! - **Conflict Store**: Unresolved conflicts are kept until a user decides
//! - **Transport Abstraction**: Pluggable transport layer (HTTP, mock)
//! - **Pure State Machine**: Uses sync-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use sync_client::{ConflictStore, HttpTransport, PendingActionQueue, SyncOrchestrator};
//!
//! let store = Arc::new(SqliteStore::open(path).await?);
//! let queue = PendingActionQueue::new(store.clone());
//! let sync = SyncOrchestrator::new(queue, ConflictStore::new(store), transport);
//!
//! sync.queue().enqueue(input).await?;
//! let result = sync.replay_all(false).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod cleanup;
pub mod config;
pub mod conflicts;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod queue;
pub mod transport;

pub use auth::{CredentialProvider, StaticToken};
pub use cleanup::{purge_resolved, spawn_cleanup_task};
pub use config::{
    CleanupConfig, ClientConfig, ConfigError, PreferencesSource, ServerConfig, StoreConfig,
};
pub use conflicts::{ConflictCounts, ConflictStore};
pub use error::{ClientError, Result};
pub use notify::{ConflictNotifier, NotifyError, RecordingNotifier};
pub use orchestrator::{AbortHandle, SyncOrchestrator, SyncResult};
pub use queue::PendingActionQueue;
pub use transport::{
    HttpTransport, HttpTransportConfig, MockTransport, SubmittedRequest, Transport, TransportError,
};
