//! SQLite store backend.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::{Entry, IndexValue, StorageError, StorageResult, Store};

/// SQLite-based store.
///
/// Uses WAL mode for concurrent reads/writes. Every secondary index written
/// is queryable.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open a store from a database path.
    ///
    /// Creates the database file if it doesn't exist.
    pub async fn open(path: &Path) -> StorageResult<Self> {
        let path_str = path.to_str().ok_or_else(|| StorageError::InvalidPath {
            path: path.to_path_buf(),
        })?;
        let options = SqliteConnectOptions::from_str(path_str)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        debug!(path = %path.display(), "opened sqlite store");
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str(":memory:")?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                value BLOB NOT NULL,
                PRIMARY KEY (collection, key)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entry_indexes (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                name TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (collection, key, name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sequences (
                name TEXT PRIMARY KEY,
                next_value INTEGER NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_entry_indexes_lookup ON entry_indexes(collection, name, value)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    key: String,
    value: Vec<u8>,
}

impl From<EntryRow> for Entry {
    fn from(row: EntryRow) -> Self {
        Entry {
            key: row.key,
            value: row.value,
        }
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn put(
        &self,
        collection: &str,
        key: &str,
        value: Vec<u8>,
        indexes: &[IndexValue<'_>],
    ) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO entries (collection, key, value)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(collection, key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM entry_indexes WHERE collection = ?1 AND key = ?2")
            .bind(collection)
            .bind(key)
            .execute(&mut *tx)
            .await?;

        for (name, index_value) in indexes {
            sqlx::query(
                "INSERT INTO entry_indexes (collection, key, name, value) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(collection)
            .bind(key)
            .bind(*name)
            .bind(index_value.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let value: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT value FROM entries WHERE collection = ?1 AND key = ?2")
                .bind(collection)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    async fn scan(&self, collection: &str) -> StorageResult<Vec<Entry>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            "SELECT key, value FROM entries WHERE collection = ?1 ORDER BY key ASC",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Entry::from).collect())
    }

    async fn scan_by_index(
        &self,
        collection: &str,
        index: &str,
        value: &str,
    ) -> StorageResult<Vec<Entry>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT e.key, e.value
            FROM entries e
            JOIN entry_indexes i ON i.collection = e.collection AND i.key = e.key
            WHERE e.collection = ?1 AND i.name = ?2 AND i.value = ?3
            ORDER BY e.key ASC
            "#,
        )
        .bind(collection)
        .bind(index)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Entry::from).collect())
    }

    async fn delete(&self, collection: &str, key: &str) -> StorageResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM entries WHERE collection = ?1 AND key = ?2")
            .bind(collection)
            .bind(key)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM entry_indexes WHERE collection = ?1 AND key = ?2")
            .bind(collection)
            .bind(key)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, collection: &str) -> StorageResult<u64> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM entries WHERE collection = ?1")
            .bind(collection)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM entry_indexes WHERE collection = ?1")
            .bind(collection)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    async fn next_id(&self, sequence: &str) -> StorageResult<u64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sequences (name, next_value)
            VALUES (?1, 2)
            ON CONFLICT(name) DO UPDATE SET next_value = next_value + 1
            RETURNING next_value - 1
            "#,
        )
        .bind(sequence)
        .fetch_one(&self.pool)
        .await?;

        Ok(id as u64)
    }
}
