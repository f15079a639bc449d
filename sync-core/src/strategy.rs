//! Field merge strategy table.
//!
//! Maps a field name to the policy that decides which version of that
//! field survives a conflict. Consulted by both the merge engine and the
//! auto-resolution engine so the two always agree.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Field stamped with the merge time on every merged record.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Bookkeeping fields never compared field-by-field.
///
/// For these the server value wins when present, else the local value is kept.
/// `updated_at` is included: it is the server's clock, not user intent.
pub const META_FIELDS: &[&str] = &[
    "id",
    "user_id",
    "created_at",
    "updated_at",
    "pending_sync",
    "local_id",
    TIMESTAMP_FIELD,
];

/// Check whether a field is bookkeeping rather than content.
pub fn is_meta_field(field: &str) -> bool {
    META_FIELDS.contains(&field)
}

/// Per-field merge policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Server value always wins (identifiers, ownership, relationships).
    ServerAuthoritative,
    /// Local value wins (free text captured offline).
    LocalPreferred,
    /// Whichever side changed more recently wins.
    LatestWins,
    /// Both text values are kept, joined by a separator.
    Combine,
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerAuthoritative => f.write_str("server_authoritative"),
            Self::LocalPreferred => f.write_str("local_preferred"),
            Self::LatestWins => f.write_str("latest_wins"),
            Self::Combine => f.write_str("combine"),
        }
    }
}

/// Built-in policy for a field name.
fn standard_strategy(field: &str) -> MergeStrategy {
    match field {
        // Identity, creation and ownership/relationship keys.
        "id" | "user_id" | "created_at" | "medication_id" | "schedule_id" | "patient_id"
        | "caregiver_id" | "conversation_id" | "sender_id" => MergeStrategy::ServerAuthoritative,

        // Free text typed while offline.
        "notes" | "description" | "comment" | "symptom_description" => {
            MergeStrategy::LocalPreferred
        }

        // status, taken_at, severity, is_read and anything unlisted.
        _ => MergeStrategy::LatestWins,
    }
}

/// The strategy table: built-in policy plus optional per-field overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyTable {
    overrides: HashMap<String, MergeStrategy>,
}

impl StrategyTable {
    /// The built-in table with no overrides.
    pub fn standard() -> Self {
        Self::default()
    }

    /// Override the policy for one field.
    pub fn with_override(mut self, field: impl Into<String>, strategy: MergeStrategy) -> Self {
        self.overrides.insert(field.into(), strategy);
        self
    }

    /// Add every override from an iterator.
    pub fn with_overrides<I, K>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, MergeStrategy)>,
        K: Into<String>,
    {
        self.overrides
            .extend(overrides.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Policy for a field.
    pub fn strategy_for(&self, field: &str) -> MergeStrategy {
        self.overrides
            .get(field)
            .copied()
            .unwrap_or_else(|| standard_strategy(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_server_authoritative() {
        let table = StrategyTable::standard();
        for field in ["id", "user_id", "created_at", "medication_id", "patient_id"] {
            assert_eq!(
                table.strategy_for(field),
                MergeStrategy::ServerAuthoritative,
                "{field}"
            );
        }
    }

    #[test]
    fn free_text_is_local_preferred() {
        let table = StrategyTable::standard();
        assert_eq!(table.strategy_for("notes"), MergeStrategy::LocalPreferred);
        assert_eq!(table.strategy_for("description"), MergeStrategy::LocalPreferred);
    }

    #[test]
    fn unlisted_fields_default_to_latest_wins() {
        let table = StrategyTable::standard();
        for field in ["status", "taken_at", "severity", "is_read", "mood_score"] {
            assert_eq!(table.strategy_for(field), MergeStrategy::LatestWins, "{field}");
        }
    }

    #[test]
    fn combine_is_unused_by_default() {
        let table = StrategyTable::standard();
        let fields = ["notes", "status", "id", "description", "comment"];
        assert!(fields
            .iter()
            .all(|f| table.strategy_for(f) != MergeStrategy::Combine));
    }

    #[test]
    fn overrides_take_precedence() {
        let table = StrategyTable::standard()
            .with_override("notes", MergeStrategy::Combine)
            .with_overrides([("severity", MergeStrategy::ServerAuthoritative)]);
        assert_eq!(table.strategy_for("notes"), MergeStrategy::Combine);
        assert_eq!(
            table.strategy_for("severity"),
            MergeStrategy::ServerAuthoritative
        );
        assert_eq!(table.strategy_for("status"), MergeStrategy::LatestWins);
    }

    #[test]
    fn meta_fields() {
        assert!(is_meta_field("id"));
        assert!(is_meta_field("timestamp"));
        assert!(is_meta_field("pending_sync"));
        assert!(!is_meta_field("status"));
    }

    #[test]
    fn strategy_deserializes_from_snake_case() {
        let s: MergeStrategy = serde_json::from_str("\"local_preferred\"").unwrap();
        assert_eq!(s, MergeStrategy::LocalPreferred);
    }
}
