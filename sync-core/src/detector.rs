//! Conflict detection.
//!
//! Classifies the discrepancy between a queued local edit and the current
//! server record. Rules are evaluated in order:
//!
//! 1. server record absent → [`ConflictKind::DeleteConflict`]
//! 2. server last-modified strictly after the local edit → [`ConflictKind::UpdateConflict`]
//! 3. local edit older than [`STALENESS_THRESHOLD_HOURS`] → [`ConflictKind::StaleData`]
//! 4. otherwise no conflict
//!
//! A deleted resource is therefore never reported as merely stale, and a
//! concurrent edit is never misclassified as old.

use chrono::{DateTime, Duration, Utc};
use sync_types::{ConflictKind, Record};

/// Age after which a local edit is considered stale.
pub const STALENESS_THRESHOLD_HOURS: i64 = 24;

/// Result of comparing local and server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    /// Whether the two versions conflict.
    pub has_conflict: bool,
    /// Kind of conflict, if any.
    pub kind: Option<ConflictKind>,
}

impl Detection {
    /// No conflict.
    pub fn none() -> Self {
        Self {
            has_conflict: false,
            kind: None,
        }
    }

    /// A conflict of the given kind.
    pub fn conflict(kind: ConflictKind) -> Self {
        Self {
            has_conflict: true,
            kind: Some(kind),
        }
    }
}

/// Classify against the current wall clock.
pub fn detect(local: &Record, server: Option<&Record>, local_timestamp: DateTime<Utc>) -> Detection {
    detect_at(local, server, local_timestamp, Utc::now())
}

/// Classify as of `now`.
pub fn detect_at(
    _local: &Record,
    server: Option<&Record>,
    local_timestamp: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Detection {
    let Some(server) = server else {
        return Detection::conflict(ConflictKind::DeleteConflict);
    };

    if server
        .last_modified()
        .is_some_and(|modified| modified > local_timestamp)
    {
        return Detection::conflict(ConflictKind::UpdateConflict);
    }

    if now - local_timestamp > Duration::hours(STALENESS_THRESHOLD_HOURS) {
        return Detection::conflict(ConflictKind::StaleData);
    }

    Detection::none()
}
