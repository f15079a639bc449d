//! # sync-store
//!
//! Local persistent store for carelog.
//!
//! A small key-value abstraction with optional secondary indexes. Keys within
//! a collection are strings and scans return entries in key order, so
//! zero-padded numeric keys scan in insertion order. Values are opaque bytes;
//! [`Collection`] layers MessagePack encoding on top.
//!
//! Backends:
//! - [`SqliteStore`]: durable, WAL-mode SQLite via sqlx
//! - [`MemoryStore`]: in-process, optionally without indexes (for testing
//!   the full-scan fallback)

#![warn(missing_docs)]
#![warn(clippy::all)]

mod collection;
mod error;
mod memory;
mod sqlite;

pub use collection::Collection;
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

/// A secondary index value attached to an entry on write.
pub type IndexValue<'a> = (&'a str, String);

/// A stored key and its raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Key within the collection.
    pub key: String,
    /// Raw value bytes.
    pub value: Vec<u8>,
}

/// Trait for local store backends.
///
/// Every write is atomic: an entry and its index values are stored together
/// or not at all.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or replace an entry and its index values.
    async fn put(
        &self,
        collection: &str,
        key: &str,
        value: Vec<u8>,
        indexes: &[IndexValue<'_>],
    ) -> StorageResult<()>;

    /// Get one entry's value.
    async fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// All entries of a collection, in key order.
    async fn scan(&self, collection: &str) -> StorageResult<Vec<Entry>>;

    /// Entries whose index `index` equals `value`, in key order.
    ///
    /// Returns [`StorageError::IndexUnavailable`] if the backend does not
    /// maintain that index.
    async fn scan_by_index(
        &self,
        collection: &str,
        index: &str,
        value: &str,
    ) -> StorageResult<Vec<Entry>>;

    /// Delete an entry. Returns whether it existed.
    async fn delete(&self, collection: &str, key: &str) -> StorageResult<bool>;

    /// Delete every entry in a collection. Returns the number removed.
    async fn clear(&self, collection: &str) -> StorageResult<u64>;

    /// Next value of a named monotonic sequence, starting at 1.
    async fn next_id(&self, sequence: &str) -> StorageResult<u64>;
}
