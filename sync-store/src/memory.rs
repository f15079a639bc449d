//! In-memory store.
//!
//! Used for tests and for ephemeral sessions. Can be built without secondary
//! indexes to exercise callers' full-scan fallback.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{Entry, IndexValue, StorageError, StorageResult, Store};

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    without_indexes: bool,
    collections: HashMap<String, BTreeMap<String, StoredEntry>>,
    sequences: HashMap<String, u64>,
    fail_writes: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredEntry {
    value: Vec<u8>,
    indexes: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store maintaining secondary indexes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with no secondary indexes.
    ///
    /// Every [`Store::scan_by_index`] call returns
    /// [`StorageError::IndexUnavailable`].
    pub fn without_indexes() -> Self {
        let store = Self::default();
        store.lock().without_indexes = true;
        store
    }

    /// Make every write fail with the given reason until cleared.
    pub fn fail_writes(&self, reason: &str) {
        self.lock().fail_writes = Some(reason.to_string());
    }

    /// Let writes succeed again.
    pub fn clear_failures(&self) {
        self.lock().fail_writes = None;
    }

    /// Number of entries in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.lock().collections.get(collection).map_or(0, BTreeMap::len)
    }

    /// Whether a collection is empty.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn lock(&self) -> MutexGuard<'_, MemoryStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl MemoryStoreInner {
    fn check_writable(&self) -> StorageResult<()> {
        match &self.fail_writes {
            Some(reason) => Err(StorageError::Unavailable {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn to_entry((key, stored): (&String, &StoredEntry)) -> Entry {
    Entry {
        key: key.clone(),
        value: stored.value.clone(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(
        &self,
        collection: &str,
        key: &str,
        value: Vec<u8>,
        indexes: &[IndexValue<'_>],
    ) -> StorageResult<()> {
        let mut inner = self.lock();
        inner.check_writable()?;

        let indexes = indexes
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), StoredEntry { value, indexes });
        Ok(())
    }

    async fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let inner = self.lock();
        Ok(inner
            .collections
            .get(collection)
            .and_then(|entries| entries.get(key))
            .map(|stored| stored.value.clone()))
    }

    async fn scan(&self, collection: &str) -> StorageResult<Vec<Entry>> {
        let inner = self.lock();
        Ok(inner
            .collections
            .get(collection)
            .map(|entries| entries.iter().map(to_entry).collect())
            .unwrap_or_default())
    }

    async fn scan_by_index(
        &self,
        collection: &str,
        index: &str,
        value: &str,
    ) -> StorageResult<Vec<Entry>> {
        let inner = self.lock();
        if inner.without_indexes {
            return Err(StorageError::IndexUnavailable {
                collection: collection.to_string(),
                index: index.to_string(),
            });
        }
        Ok(inner
            .collections
            .get(collection)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, stored)| stored.indexes.get(index).map(String::as_str) == Some(value))
                    .map(to_entry)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, collection: &str, key: &str) -> StorageResult<bool> {
        let mut inner = self.lock();
        inner.check_writable()?;
        Ok(inner
            .collections
            .get_mut(collection)
            .and_then(|entries| entries.remove(key))
            .is_some())
    }

    async fn clear(&self, collection: &str) -> StorageResult<u64> {
        let mut inner = self.lock();
        inner.check_writable()?;
        let removed = inner
            .collections
            .remove(collection)
            .map_or(0, |entries| entries.len());
        Ok(removed as u64)
    }

    async fn next_id(&self, sequence: &str) -> StorageResult<u64> {
        let mut inner = self.lock();
        inner.check_writable()?;
        let next = inner.sequences.entry(sequence.to_string()).or_insert(0);
        *next += 1;
        Ok(*next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete() {
        let store = MemoryStore::new();
        store.put("c", "k", b"v".to_vec(), &[]).await.unwrap();

        assert_eq!(store.get("c", "k").await.unwrap(), Some(b"v".to_vec()));
        assert!(store.delete("c", "k").await.unwrap());
        assert!(!store.delete("c", "k").await.unwrap());
        assert_eq!(store.get("c", "k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn scan_returns_key_order() {
        let store = MemoryStore::new();
        for key in ["0003", "0001", "0002"] {
            store.put("c", key, key.as_bytes().to_vec(), &[]).await.unwrap();
        }
        let keys: Vec<_> = store.scan("c").await.unwrap().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["0001", "0002", "0003"]);
    }

    #[tokio::test]
    async fn scan_by_index_filters() {
        let store = MemoryStore::new();
        store.put("c", "a", vec![1], &[("resolved", "false".into())]).await.unwrap();
        store.put("c", "b", vec![2], &[("resolved", "true".into())]).await.unwrap();

        let open = store.scan_by_index("c", "resolved", "false").await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].key, "a");
    }

    #[tokio::test]
    async fn index_less_store_reports_unavailable() {
        let store = MemoryStore::without_indexes();
        store.put("c", "a", vec![1], &[("resolved", "false".into())]).await.unwrap();

        let err = store.scan_by_index("c", "resolved", "false").await.unwrap_err();
        assert!(err.is_index_unavailable());
        assert_eq!(store.scan("c").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sequences_are_monotonic_per_name() {
        let store = MemoryStore::new();
        assert_eq!(store.next_id("a").await.unwrap(), 1);
        assert_eq!(store.next_id("a").await.unwrap(), 2);
        assert_eq!(store.next_id("b").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn write_failures_are_injected() {
        let store = MemoryStore::new();
        store.fail_writes("disk full");
        let err = store.put("c", "k", vec![], &[]).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));

        store.clear_failures();
        store.put("c", "k", vec![], &[]).await.unwrap();
        assert_eq!(store.len("c"), 1);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.put("c", "k", vec![7], &[]).await.unwrap();
        assert_eq!(other.get("c", "k").await.unwrap(), Some(vec![7]));
        assert_eq!(other.clear("c").await.unwrap(), 1);
        assert!(store.is_empty("c"));
    }
}
