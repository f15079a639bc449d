//! Typed view over one collection of a [`Store`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::{IndexValue, StorageResult, Store};

/// A named collection of MessagePack-encoded values of type `T`.
pub struct Collection<T> {
    store: Arc<dyn Store>,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: self.name,
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection").field("name", &self.name).finish()
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Open a collection on a store.
    pub fn new(store: Arc<dyn Store>, name: &'static str) -> Self {
        Self {
            store,
            name,
            _marker: PhantomData,
        }
    }

    /// Collection name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Encode and store a value.
    pub async fn put(&self, key: &str, value: &T, indexes: &[IndexValue<'_>]) -> StorageResult<()> {
        let bytes = sync_types::encode(value)?;
        self.store.put(self.name, key, bytes, indexes).await
    }

    /// Load and decode a value.
    pub async fn get(&self, key: &str) -> StorageResult<Option<T>> {
        match self.store.get(self.name, key).await? {
            Some(bytes) => Ok(Some(sync_types::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Every value, in key order.
    pub async fn scan(&self) -> StorageResult<Vec<T>> {
        let entries = self.store.scan(self.name).await?;
        entries
            .iter()
            .map(|entry| sync_types::decode(&entry.value).map_err(Into::into))
            .collect()
    }

    /// Values matching a secondary index, in key order.
    pub async fn scan_by_index(&self, index: &str, value: &str) -> StorageResult<Vec<T>> {
        let entries = self.store.scan_by_index(self.name, index, value).await?;
        entries
            .iter()
            .map(|entry| sync_types::decode(&entry.value).map_err(Into::into))
            .collect()
    }

    /// Delete one value. Returns whether it existed.
    pub async fn delete(&self, key: &str) -> StorageResult<bool> {
        self.store.delete(self.name, key).await
    }

    /// Delete every value. Returns the number removed.
    pub async fn clear(&self) -> StorageResult<u64> {
        self.store.clear(self.name).await
    }

    /// Next id from the sequence named after this collection.
    pub async fn next_id(&self) -> StorageResult<u64> {
        self.store.next_id(self.name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
        done: bool,
    }

    fn notes() -> Collection<Note> {
        Collection::new(Arc::new(MemoryStore::new()), "notes")
    }

    #[tokio::test]
    async fn typed_round_trip_through_store() {
        let notes = notes();
        let note = Note {
            text: "refill".into(),
            done: false,
        };
        notes.put("a", &note, &[("done", "false".into())]).await.unwrap();

        assert_eq!(notes.get("a").await.unwrap(), Some(note.clone()));
        assert_eq!(notes.scan_by_index("done", "false").await.unwrap(), vec![note]);
        assert!(notes.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn undecodable_bytes_surface_codec_error() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        store.put("notes", "bad", vec![0xc1], &[]).await.unwrap();

        let notes: Collection<Note> = Collection::new(store, "notes");
        let err = notes.get("bad").await.unwrap_err();
        assert!(matches!(err, crate::StorageError::Codec(_)));
    }
}
