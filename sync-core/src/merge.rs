//! Field-by-field merge of a local and a server record.
//!
//! The merge engine always picks a side for every differing field, even on
//! near-ties, because it feeds previews shown to the user. Whether the
//! result may be applied silently is the auto-resolution engine's call.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use sync_types::{FieldValue, Record};

use crate::strategy::{is_meta_field, MergeStrategy, StrategyTable, TIMESTAMP_FIELD};

/// Separator placed between texts joined by [`MergeStrategy::Combine`].
pub const COMBINE_SEPARATOR: &str = "\n---\n";

/// Which version a merged field came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldSource {
    /// The local value.
    Local,
    /// The server value.
    Server,
    /// A combination of both.
    Merged,
}

/// How one differing field was merged.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMergeDecision {
    /// Field name.
    pub field: String,
    /// Local value (absent if the field only exists server-side).
    pub local_value: Option<FieldValue>,
    /// Server value (absent if the field only exists locally).
    pub server_value: Option<FieldValue>,
    /// Value written to the merged record.
    pub merged_value: Option<FieldValue>,
    /// Where the merged value came from.
    pub source: FieldSource,
    /// Policy that was applied.
    pub strategy: MergeStrategy,
}

/// Output of a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeResult {
    /// The merged record.
    pub merged_data: Record,
    /// One decision per differing field, in field order.
    pub field_decisions: Vec<FieldMergeDecision>,
    /// Whether the merge differs from a plain copy of the server record.
    pub has_changes: bool,
}

/// Merges records according to a strategy table.
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    table: StrategyTable,
}

impl MergeEngine {
    /// Create a merge engine over the given table.
    pub fn new(table: StrategyTable) -> Self {
        Self { table }
    }

    /// The strategy table in use.
    pub fn table(&self) -> &StrategyTable {
        &self.table
    }

    /// Merge, stamping the result with the current time.
    pub fn merge(&self, local: &Record, server: &Record, local_timestamp: DateTime<Utc>) -> MergeResult {
        self.merge_at(local, server, local_timestamp, Utc::now())
    }

    /// Merge, stamping the result with `now`.
    pub fn merge_at(
        &self,
        local: &Record,
        server: &Record,
        local_timestamp: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> MergeResult {
        let server_timestamp = server.last_modified();
        let fields: BTreeSet<&str> = local.fields().chain(server.fields()).collect();

        let mut merged_data = Record::new();
        let mut field_decisions = Vec::new();

        for field in fields {
            let local_value = local.get(field);
            let server_value = server.get(field);

            if is_meta_field(field) {
                if let Some(value) = server_value.or(local_value) {
                    merged_data.insert(field, value.clone());
                }
                continue;
            }

            let strategy = self.table.strategy_for(field);
            let (value, source) = match (local_value, server_value) {
                (Some(l), Some(s)) if l == s => {
                    merged_data.insert(field, s.clone());
                    continue;
                }
                (Some(l), None) => (l.clone(), FieldSource::Local),
                (None, Some(s)) => (s.clone(), FieldSource::Server),
                (Some(l), Some(s)) => {
                    resolve_field(strategy, l, s, local_timestamp, server_timestamp)
                }
                (None, None) => continue,
            };

            merged_data.insert(field, value.clone());
            field_decisions.push(FieldMergeDecision {
                field: field.to_string(),
                local_value: local_value.cloned(),
                server_value: server_value.cloned(),
                merged_value: Some(value),
                source,
                strategy,
            });
        }

        let has_changes = field_decisions
            .iter()
            .any(|decision| decision.merged_value != decision.server_value);
        merged_data.insert(TIMESTAMP_FIELD, now);

        MergeResult {
            merged_data,
            field_decisions,
            has_changes,
        }
    }
}

/// Whether the local edit is the more recent one.
///
/// Strict comparison; the server wins ties. A server record without a
/// modification time cannot be shown to be newer, so the local edit wins.
pub(crate) fn local_is_newer(
    local_timestamp: DateTime<Utc>,
    server_timestamp: Option<DateTime<Utc>>,
) -> bool {
    server_timestamp.map_or(true, |server| local_timestamp > server)
}

fn resolve_field(
    strategy: MergeStrategy,
    local: &FieldValue,
    server: &FieldValue,
    local_timestamp: DateTime<Utc>,
    server_timestamp: Option<DateTime<Utc>>,
) -> (FieldValue, FieldSource) {
    let latest = || {
        if local_is_newer(local_timestamp, server_timestamp) {
            (local.clone(), FieldSource::Local)
        } else {
            (server.clone(), FieldSource::Server)
        }
    };

    match strategy {
        MergeStrategy::ServerAuthoritative => (server.clone(), FieldSource::Server),
        MergeStrategy::LocalPreferred => (local.clone(), FieldSource::Local),
        MergeStrategy::LatestWins => latest(),
        MergeStrategy::Combine => {
            if local.is_blank() {
                (server.clone(), FieldSource::Server)
            } else if server.is_blank() {
                (local.clone(), FieldSource::Local)
            } else if let (Some(l), Some(s)) = (local.as_str(), server.as_str()) {
                (
                    FieldValue::Text(format!("{s}{COMBINE_SEPARATOR}{l}")),
                    FieldSource::Merged,
                )
            } else {
                latest()
            }
        }
    }
}
