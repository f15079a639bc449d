//! Durable conflict records awaiting review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{ActionId, ConflictId, Record};

/// Resource types that can conflict with server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Medication-intake log.
    LogEntry,
    /// Symptom entry.
    SymptomEntry,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogEntry => f.write_str("log_entry"),
            Self::SymptomEntry => f.write_str("symptom_entry"),
        }
    }
}

/// How local and server state disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Server modified the resource after the local edit was made.
    UpdateConflict,
    /// Server no longer has the resource.
    DeleteConflict,
    /// Local edit is older than the staleness threshold.
    StaleData,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpdateConflict => f.write_str("update_conflict"),
            Self::DeleteConflict => f.write_str("delete_conflict"),
            Self::StaleData => f.write_str("stale_data"),
        }
    }
}

/// Outcome chosen for a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Push the local version over the server's.
    KeepLocal,
    /// Drop the local edit.
    KeepServer,
    /// Push a field-by-field merge of both.
    Merge,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepLocal => f.write_str("keep_local"),
            Self::KeepServer => f.write_str("keep_server"),
            Self::Merge => f.write_str("merge"),
        }
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "keep_local" | "local" => Ok(Self::KeepLocal),
            "keep_server" | "server" => Ok(Self::KeepServer),
            "merge" => Ok(Self::Merge),
            other => Err(format!("unknown resolution: {other}")),
        }
    }
}

/// A conflict that could not be resolved silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictEntry {
    /// Generated identifier.
    pub id: ConflictId,
    /// Type of the conflicting resource.
    pub resource_type: ResourceType,
    /// The queued local version.
    pub local_data: Record,
    /// Server version; absent only for [`ConflictKind::DeleteConflict`].
    pub server_data: Option<Record>,
    /// Classification.
    pub conflict_kind: ConflictKind,
    /// When the local edit was made.
    pub local_timestamp: DateTime<Utc>,
    /// Server last-modified time, when known.
    pub server_timestamp: Option<DateTime<Utc>>,
    /// The pending action that produced this conflict.
    pub source_action_id: ActionId,
    /// Whether a resolution has been chosen.
    pub resolved: bool,
    /// The chosen resolution.
    pub resolution: Option<Resolution>,
    /// When the resolution was chosen.
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
}

impl ConflictEntry {
    /// Record a new unresolved conflict.
    ///
    /// Missing server data always yields a [`ConflictKind::DeleteConflict`].
    pub fn new(
        resource_type: ResourceType,
        local_data: Record,
        server_data: Option<Record>,
        conflict_kind: ConflictKind,
        local_timestamp: DateTime<Utc>,
        source_action_id: ActionId,
    ) -> Self {
        let conflict_kind = if server_data.is_none() {
            ConflictKind::DeleteConflict
        } else {
            conflict_kind
        };
        let server_timestamp = server_data.as_ref().and_then(Record::last_modified);
        Self {
            id: ConflictId::new(),
            resource_type,
            local_data,
            server_data,
            conflict_kind,
            local_timestamp,
            server_timestamp,
            source_action_id,
            resolved: false,
            resolution: None,
            resolved_at: None,
            created_at: Utc::now(),
        }
    }

    /// Mark resolved with the given outcome.
    pub fn mark_resolved(&mut self, resolution: Resolution, at: DateTime<Utc>) {
        self.resolved = true;
        self.resolution = Some(resolution);
        self.resolved_at = Some(at);
    }
}
