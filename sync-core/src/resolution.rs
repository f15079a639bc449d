//! Auto-resolution engine.
//!
//! Decides whether a detected conflict can be settled without asking the
//! user, and if so how. The ladder is deliberately conservative: ties,
//! mixed strategies and anything else ambiguous go to manual review.
//!
//! 1. No differing fields → keep server (only a timestamp skew).
//! 2. One differing field → follow its strategy; latest-wins needs a time
//!    gap strictly greater than the configured threshold.
//! 3. Several differing fields sharing one strategy → same as 2.
//! 4. Merge fallback → accept the merge if no field in it is ambiguous.
//! 5. Otherwise manual.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use sync_types::{ConflictKind, FieldValue, Record, Resolution};

use crate::merge::{local_is_newer, FieldSource, MergeEngine, MergeResult};
use crate::strategy::{is_meta_field, MergeStrategy, StrategyTable};

/// User preferences governing silent resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoResolutionPreferences {
    /// Master switch.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Allow resolving single-field differences.
    #[serde(default = "default_true")]
    pub allow_single_field_auto: bool,
    /// Allow resolving multi-field differences with a shared strategy.
    #[serde(default = "default_true")]
    pub allow_multi_field_auto: bool,
    /// Allow accepting an unambiguous merge.
    #[serde(default = "default_true")]
    pub allow_auto_merge: bool,
    /// Minimum gap, in seconds, before latest-wins may pick a side silently.
    #[serde(default = "default_threshold_secs")]
    pub time_difference_threshold_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_threshold_secs() -> u64 {
    60
}

impl Default for AutoResolutionPreferences {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_single_field_auto: true,
            allow_multi_field_auto: true,
            allow_auto_merge: true,
            time_difference_threshold_secs: default_threshold_secs(),
        }
    }
}

impl AutoResolutionPreferences {
    /// Preferences with auto-resolution switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// The latest-wins threshold as a duration.
    ///
    /// Values too large for a `Duration` saturate, so no gap ever exceeds them.
    pub fn threshold(&self) -> Duration {
        i64::try_from(self.time_difference_threshold_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }
}

/// A conflict as seen by the engine.
#[derive(Debug, Clone, Copy)]
pub struct ConflictInput<'a> {
    /// Local version.
    pub local: &'a Record,
    /// Server version, absent if deleted server-side.
    pub server: Option<&'a Record>,
    /// Detected kind.
    pub kind: ConflictKind,
    /// When the local edit was made.
    pub local_timestamp: DateTime<Utc>,
}

/// A field whose local and server values differ.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDifference {
    /// Field name.
    pub field: String,
    /// Policy for the field.
    pub strategy: MergeStrategy,
    /// Local value, if present.
    pub local_value: Option<FieldValue>,
    /// Server value, if present.
    pub server_value: Option<FieldValue>,
}

/// Why the engine decided as it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionReason {
    /// Auto-resolution switched off.
    Disabled,
    /// Resource gone server-side; a human must choose.
    DeleteConflict,
    /// Versions only differ in bookkeeping fields.
    NoDifferences,
    /// Every differing field is server-authoritative.
    ServerAuthoritative,
    /// Every differing field is local-preferred.
    LocalPreferred,
    /// Latest-wins with a clear time gap.
    LatestWins,
    /// Unambiguous merge accepted.
    Merged,
    /// Latest-wins gap not strictly greater than the threshold.
    WithinTimeThreshold,
    /// Latest-wins needed a server timestamp that was missing.
    MissingServerTimestamp,
    /// Differing fields use different strategies.
    MixedStrategies,
    /// Nothing allowed by preferences applied.
    ManualReviewRequired,
}

impl fmt::Display for ResolutionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Disabled => "auto-resolution disabled",
            Self::DeleteConflict => "resource deleted on server",
            Self::NoDifferences => "no differing fields",
            Self::ServerAuthoritative => "server-authoritative fields",
            Self::LocalPreferred => "local-preferred fields",
            Self::LatestWins => "newer version wins",
            Self::Merged => "unambiguous merge",
            Self::WithinTimeThreshold => "edits too close in time",
            Self::MissingServerTimestamp => "server modification time unknown",
            Self::MixedStrategies => "fields use different strategies",
            Self::ManualReviewRequired => "manual review required",
        };
        f.write_str(text)
    }
}

/// The engine's verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoResolution {
    /// Whether the conflict may be resolved silently.
    pub can_auto_resolve: bool,
    /// Why.
    pub reason: ResolutionReason,
    /// Chosen resolution, when auto-resolvable.
    pub resolution: Option<Resolution>,
    /// Record to apply, when auto-resolvable.
    pub resolved_data: Option<Record>,
    /// Differing fields, for rendering a comparison.
    pub differing_fields: Vec<FieldDifference>,
}

impl AutoResolution {
    fn resolved(
        resolution: Resolution,
        data: Record,
        reason: ResolutionReason,
        differing_fields: Vec<FieldDifference>,
    ) -> Self {
        Self {
            can_auto_resolve: true,
            reason,
            resolution: Some(resolution),
            resolved_data: Some(data),
            differing_fields,
        }
    }

    fn manual(reason: ResolutionReason, differing_fields: Vec<FieldDifference>) -> Self {
        Self {
            can_auto_resolve: false,
            reason,
            resolution: None,
            resolved_data: None,
            differing_fields,
        }
    }
}

/// Applies preferences and the strategy table to a conflict.
#[derive(Debug, Clone, Default)]
pub struct AutoResolutionEngine {
    merger: MergeEngine,
}

impl AutoResolutionEngine {
    /// Create an engine over the given strategy table.
    pub fn new(table: StrategyTable) -> Self {
        Self {
            merger: MergeEngine::new(table),
        }
    }

    /// The merge engine used for the merge fallback.
    pub fn merger(&self) -> &MergeEngine {
        &self.merger
    }

    /// Fields (excluding bookkeeping) whose values differ, in field order.
    pub fn differing_fields(&self, local: &Record, server: &Record) -> Vec<FieldDifference> {
        let fields: BTreeSet<&str> = local.fields().chain(server.fields()).collect();
        fields
            .into_iter()
            .filter(|field| !is_meta_field(field))
            .filter(|field| local.get(field) != server.get(field))
            .map(|field| FieldDifference {
                field: field.to_string(),
                strategy: self.merger.table().strategy_for(field),
                local_value: local.get(field).cloned(),
                server_value: server.get(field).cloned(),
            })
            .collect()
    }

    /// Decide whether and how to resolve a conflict silently.
    pub fn evaluate(
        &self,
        conflict: ConflictInput<'_>,
        prefs: &AutoResolutionPreferences,
    ) -> AutoResolution {
        let server = match conflict.server {
            Some(server) if conflict.kind != ConflictKind::DeleteConflict => server,
            _ => return AutoResolution::manual(ResolutionReason::DeleteConflict, Vec::new()),
        };
        let local = conflict.local;
        let diffs = self.differing_fields(local, server);

        if !prefs.enabled {
            return AutoResolution::manual(ResolutionReason::Disabled, diffs);
        }

        if diffs.is_empty() {
            return AutoResolution::resolved(
                Resolution::KeepServer,
                server.clone(),
                ResolutionReason::NoDifferences,
                diffs,
            );
        }

        let server_timestamp = server.last_modified();
        let shared = shared_strategy(&diffs);
        let mut reason = ResolutionReason::ManualReviewRequired;

        let ladder_allowed = if diffs.len() == 1 {
            prefs.allow_single_field_auto
        } else {
            prefs.allow_multi_field_auto
        };

        if ladder_allowed {
            match shared {
                Some(MergeStrategy::ServerAuthoritative) => {
                    return AutoResolution::resolved(
                        Resolution::KeepServer,
                        server.clone(),
                        ResolutionReason::ServerAuthoritative,
                        diffs,
                    );
                }
                Some(MergeStrategy::LocalPreferred) => {
                    return AutoResolution::resolved(
                        Resolution::KeepLocal,
                        local.clone(),
                        ResolutionReason::LocalPreferred,
                        diffs,
                    );
                }
                Some(MergeStrategy::LatestWins) => {
                    match newer_side(conflict.local_timestamp, server_timestamp, prefs) {
                        Ok(Resolution::KeepLocal) => {
                            return AutoResolution::resolved(
                                Resolution::KeepLocal,
                                local.clone(),
                                ResolutionReason::LatestWins,
                                diffs,
                            );
                        }
                        Ok(_) => {
                            return AutoResolution::resolved(
                                Resolution::KeepServer,
                                server.clone(),
                                ResolutionReason::LatestWins,
                                diffs,
                            );
                        }
                        Err(ambiguity) => reason = ambiguity,
                    }
                }
                Some(MergeStrategy::Combine) | None => {}
            }
        }

        if shared.is_none() {
            return AutoResolution::manual(ResolutionReason::MixedStrategies, diffs);
        }

        if prefs.allow_auto_merge {
            let merged = self.merger.merge(local, server, conflict.local_timestamp);
            match merge_ambiguity(&merged, conflict.local_timestamp, server_timestamp, prefs) {
                None => {
                    return AutoResolution::resolved(
                        Resolution::Merge,
                        merged.merged_data,
                        ResolutionReason::Merged,
                        diffs,
                    );
                }
                Some(ambiguity) => reason = ambiguity,
            }
        }

        AutoResolution::manual(reason, diffs)
    }
}

/// The strategy shared by every differing field, if there is one.
fn shared_strategy(diffs: &[FieldDifference]) -> Option<MergeStrategy> {
    let first = diffs.first()?.strategy;
    diffs
        .iter()
        .all(|d| d.strategy == first)
        .then_some(first)
}

/// Pick the newer side when the gap strictly exceeds the threshold.
fn newer_side(
    local_timestamp: DateTime<Utc>,
    server_timestamp: Option<DateTime<Utc>>,
    prefs: &AutoResolutionPreferences,
) -> Result<Resolution, ResolutionReason> {
    let server_timestamp = server_timestamp.ok_or(ResolutionReason::MissingServerTimestamp)?;
    let gap = if local_timestamp > server_timestamp {
        local_timestamp - server_timestamp
    } else {
        server_timestamp - local_timestamp
    };
    if gap <= prefs.threshold() {
        return Err(ResolutionReason::WithinTimeThreshold);
    }
    if local_is_newer(local_timestamp, Some(server_timestamp)) {
        Ok(Resolution::KeepLocal)
    } else {
        Ok(Resolution::KeepServer)
    }
}

/// Why a merge may not be applied silently, if it may not.
fn merge_ambiguity(
    merged: &MergeResult,
    local_timestamp: DateTime<Utc>,
    server_timestamp: Option<DateTime<Utc>>,
    prefs: &AutoResolutionPreferences,
) -> Option<ResolutionReason> {
    for decision in &merged.field_decisions {
        if decision.source == FieldSource::Merged {
            return Some(ResolutionReason::ManualReviewRequired);
        }
        let both_sides = decision.local_value.is_some() && decision.server_value.is_some();
        if both_sides && decision.strategy == MergeStrategy::LatestWins {
            if let Err(ambiguity) = newer_side(local_timestamp, server_timestamp, prefs) {
                return Some(ambiguity);
            }
        }
    }
    None
}
