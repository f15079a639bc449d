//! Conflict store.
//!
//! Persists conflicts awaiting review. Entries are indexed by `resolved` and
//! `source_action_id`; on a store without those indexes every query falls
//! back to a full scan with an in-memory filter.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use sync_store::{Collection, Store};
use sync_types::{ActionId, ConflictEntry, ConflictId, Resolution};
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};

/// Store collection holding conflicts.
pub const CONFLICT_COLLECTION: &str = "conflicts";

const RESOLVED_INDEX: &str = "resolved";
const SOURCE_ACTION_INDEX: &str = "source_action_id";

/// Totals reported by [`ConflictStore::count_unresolved`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConflictCounts {
    /// All stored conflicts.
    pub total: usize,
    /// Conflicts still awaiting a decision.
    pub unresolved: usize,
}

/// Durable store of [`ConflictEntry`] records.
#[derive(Debug, Clone)]
pub struct ConflictStore {
    conflicts: Collection<ConflictEntry>,
    fallback_logged: Arc<AtomicBool>,
}

impl ConflictStore {
    /// Open the conflict store on a store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            conflicts: Collection::new(store, CONFLICT_COLLECTION),
            fallback_logged: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Persist a new conflict.
    pub async fn create(&self, entry: &ConflictEntry) -> Result<ConflictId> {
        self.save(entry).await?;
        info!(
            conflict_id = %entry.id,
            action_id = %entry.source_action_id,
            kind = %entry.conflict_kind,
            resource = %entry.resource_type,
            "recorded conflict"
        );
        Ok(entry.id)
    }

    /// One conflict.
    pub async fn get(&self, id: ConflictId) -> Result<Option<ConflictEntry>> {
        Ok(self.conflicts.get(&id.key()).await?)
    }

    /// Every conflict, oldest first.
    pub async fn list_all(&self) -> Result<Vec<ConflictEntry>> {
        Ok(sorted(self.conflicts.scan().await?))
    }

    /// Conflicts awaiting a decision, oldest first.
    pub async fn list_unresolved(&self) -> Result<Vec<ConflictEntry>> {
        self.query(RESOLVED_INDEX, "false", |c| !c.resolved).await
    }

    /// The unresolved conflict produced by an action, if any.
    pub async fn find_for_action(&self, action_id: ActionId) -> Result<Option<ConflictEntry>> {
        let matches = self
            .query(SOURCE_ACTION_INDEX, &action_id.key(), |c| {
                c.source_action_id == action_id
            })
            .await?;
        Ok(matches.into_iter().find(|c| !c.resolved))
    }

    /// Delete a conflict. Returns whether it existed.
    pub async fn delete(&self, id: ConflictId) -> Result<bool> {
        let removed = self.conflicts.delete(&id.key()).await?;
        debug!(conflict_id = %id, removed, "deleted conflict");
        Ok(removed)
    }

    /// Total and unresolved counts.
    pub async fn count_unresolved(&self) -> Result<ConflictCounts> {
        let all = self.conflicts.scan().await?;
        Ok(ConflictCounts {
            total: all.len(),
            unresolved: all.iter().filter(|c| !c.resolved).count(),
        })
    }

    /// Delete every resolved conflict. Returns the number removed.
    pub async fn clear_resolved(&self) -> Result<u64> {
        self.clear_resolved_matching(|_| true).await
    }

    /// Delete resolved conflicts whose resolution is older than `cutoff`.
    pub async fn clear_resolved_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        self.clear_resolved_matching(|c| c.resolved_at.map_or(true, |at| at < cutoff))
            .await
    }

    /// Record the chosen resolution.
    ///
    /// Fails with [`ClientError::NotFound`] if the id does not exist.
    pub async fn resolve(&self, id: ConflictId, resolution: Resolution) -> Result<ConflictEntry> {
        let mut entry = self
            .get(id)
            .await?
            .ok_or_else(|| ClientError::conflict_not_found(id))?;
        entry.mark_resolved(resolution, Utc::now());
        self.save(&entry).await?;
        info!(conflict_id = %id, %resolution, "resolved conflict");
        Ok(entry)
    }

    async fn save(&self, entry: &ConflictEntry) -> Result<()> {
        let indexes = [
            (RESOLVED_INDEX, entry.resolved.to_string()),
            (SOURCE_ACTION_INDEX, entry.source_action_id.key()),
        ];
        self.conflicts.put(&entry.id.key(), entry, &indexes).await?;
        Ok(())
    }

    async fn clear_resolved_matching(&self, keep: impl Fn(&ConflictEntry) -> bool) -> Result<u64> {
        let resolved = self.query(RESOLVED_INDEX, "true", |c| c.resolved).await?;
        let mut removed = 0;
        for entry in resolved.iter().filter(|c| keep(c)) {
            if self.conflicts.delete(&entry.id.key()).await? {
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, "cleared resolved conflicts");
        }
        Ok(removed)
    }

    /// Index lookup, degrading to scan-and-filter when the index is missing.
    async fn query(
        &self,
        index: &str,
        value: &str,
        filter: impl Fn(&ConflictEntry) -> bool,
    ) -> Result<Vec<ConflictEntry>> {
        match self.conflicts.scan_by_index(index, value).await {
            Ok(entries) => Ok(sorted(entries)),
            Err(e) if e.is_index_unavailable() => {
                if !self.fallback_logged.swap(true, Ordering::Relaxed) {
                    warn!(index, "conflict index unavailable; using full scan");
                }
                let all = self.conflicts.scan().await?;
                Ok(sorted(all.into_iter().filter(|c| filter(c)).collect()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn sorted(mut entries: Vec<ConflictEntry>) -> Vec<ConflictEntry> {
    entries.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.source_action_id.cmp(&b.source_action_id))
    });
    entries
}
