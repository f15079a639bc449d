//! Assertion helpers for sync scenarios.
//!
//! These are pure functions that verify queue and server state after a
//! scenario completes. They take state as input and return pass/fail.

use std::collections::{HashMap, HashSet};
use sync_client::SubmittedRequest;
use sync_types::{ActionId, ConflictEntry, PendingAction};

/// Result of an assertion check.
#[derive(Debug, Clone)]
pub struct AssertionResult {
    /// Whether the assertion passed
    pub passed: bool,
    /// Description of what was checked
    pub description: String,
    /// Details on failure
    pub failure_details: Option<String>,
}

impl AssertionResult {
    /// Create a passing result.
    pub fn pass(description: &str) -> Self {
        Self {
            passed: true,
            description: description.into(),
            failure_details: None,
        }
    }

    /// Create a failing result.
    pub fn fail(description: &str, details: &str) -> Self {
        Self {
            passed: false,
            description: description.into(),
            failure_details: Some(details.into()),
        }
    }
}

/// Assert that every expected URL was either replayed or is still queued.
///
/// An action that is in neither place was lost.
pub fn assert_no_action_lost(
    expected_urls: &[&str],
    submitted: &[SubmittedRequest],
    still_queued: &[PendingAction],
) -> AssertionResult {
    let replayed: HashSet<&str> = submitted.iter().map(|r| r.url.as_str()).collect();
    let queued: HashSet<&str> = still_queued.iter().map(|a| a.target_url.as_str()).collect();

    for url in expected_urls {
        if !replayed.contains(url) && !queued.contains(url) {
            return AssertionResult::fail(
                "No action lost",
                &format!(
                    "Action for {} was neither replayed nor queued ({} replayed, {} queued)",
                    url,
                    replayed.len(),
                    queued.len()
                ),
            );
        }
    }

    AssertionResult::pass(&format!("All {} actions accounted for", expected_urls.len()))
}

/// Assert that no request reached the server twice.
pub fn assert_no_duplicate_replays(submitted: &[SubmittedRequest]) -> AssertionResult {
    let mut seen: HashMap<(&str, Option<String>), usize> = HashMap::new();
    for request in submitted {
        let body = request.body.as_ref().map(|b| b.to_json().to_string());
        *seen.entry((request.url.as_str(), body)).or_default() += 1;
    }

    if let Some(((url, _), count)) = seen.iter().find(|(_, count)| **count > 1) {
        return AssertionResult::fail(
            "No duplicate replays",
            &format!("Request to {} was replayed {} times", url, count),
        );
    }

    AssertionResult::pass(&format!("{} distinct replays", submitted.len()))
}

/// Assert that queued actions are in strictly increasing id order.
pub fn assert_queue_order(actions: &[PendingAction]) -> AssertionResult {
    for pair in actions.windows(2) {
        if pair[0].id >= pair[1].id {
            return AssertionResult::fail(
                "Queue order",
                &format!("Action {} listed before action {}", pair[0].id, pair[1].id),
            );
        }
    }
    AssertionResult::pass(&format!("{} actions in enqueue order", actions.len()))
}

/// Assert that no action has more than one open conflict.
pub fn assert_one_open_conflict_per_action(conflicts: &[ConflictEntry]) -> AssertionResult {
    let mut open: HashMap<ActionId, usize> = HashMap::new();
    for conflict in conflicts.iter().filter(|c| !c.resolved) {
        *open.entry(conflict.source_action_id).or_default() += 1;
    }

    if let Some((action, count)) = open.iter().find(|(_, count)| **count > 1) {
        return AssertionResult::fail(
            "One open conflict per action",
            &format!("Action {} has {} open conflicts", action, count),
        );
    }

    AssertionResult::pass(&format!("{} actions with open conflicts", open.len()))
}

/// Assert that every open conflict still has its action queued.
pub fn assert_conflicts_keep_actions(
    conflicts: &[ConflictEntry],
    still_queued: &[PendingAction],
) -> AssertionResult {
    let queued: HashSet<ActionId> = still_queued.iter().map(|a| a.id).collect();
    for conflict in conflicts.iter().filter(|c| !c.resolved) {
        if !queued.contains(&conflict.source_action_id) {
            return AssertionResult::fail(
                "Conflicts keep actions",
                &format!(
                    "Conflict {} refers to action {} which is no longer queued",
                    conflict.id, conflict.source_action_id
                ),
            );
        }
    }
    AssertionResult::pass("Every open conflict has its action queued")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use sync_types::{ActionType, ConflictKind, Method, PendingActionInput, Record, ResourceType};

    fn action(id: u64, url: &str) -> PendingAction {
        PendingActionInput::new(
            ActionType::LogEntry,
            Method::Create,
            url,
            Record::new().with("status", "taken"),
        )
        .into_action(ActionId::new(id), Utc::now())
    }

    fn request(url: &str) -> SubmittedRequest {
        SubmittedRequest {
            method: Method::Create,
            url: url.into(),
            headers: BTreeMap::new(),
            body: Some(Record::new().with("status", "taken")),
        }
    }

    fn conflict(action: u64) -> ConflictEntry {
        ConflictEntry::new(
            ResourceType::LogEntry,
            Record::new(),
            Some(Record::new()),
            ConflictKind::UpdateConflict,
            Utc::now(),
            ActionId::new(action),
        )
    }

    #[test]
    fn lost_action_detected() {
        let result = assert_no_action_lost(&["/a", "/b"], &[request("/a")], &[]);
        assert!(!result.passed);
        assert!(result.failure_details.unwrap().contains("/b"));

        let result = assert_no_action_lost(&["/a", "/b"], &[request("/a")], &[action(2, "/b")]);
        assert!(result.passed);
    }

    #[test]
    fn duplicate_replay_detected() {
        assert!(assert_no_duplicate_replays(&[request("/a"), request("/b")]).passed);
        assert!(!assert_no_duplicate_replays(&[request("/a"), request("/a")]).passed);
    }

    #[test]
    fn queue_order_checked() {
        assert!(assert_queue_order(&[action(1, "/a"), action(2, "/b")]).passed);
        assert!(!assert_queue_order(&[action(2, "/b"), action(1, "/a")]).passed);
    }

    #[test]
    fn duplicate_open_conflicts_detected() {
        assert!(assert_one_open_conflict_per_action(&[conflict(1), conflict(2)]).passed);
        assert!(!assert_one_open_conflict_per_action(&[conflict(1), conflict(1)]).passed);

        let mut resolved = conflict(1);
        resolved.mark_resolved(sync_types::Resolution::KeepServer, Utc::now());
        assert!(assert_one_open_conflict_per_action(&[resolved, conflict(1)]).passed);
    }

    #[test]
    fn orphaned_conflict_detected() {
        assert!(assert_conflicts_keep_actions(&[conflict(1)], &[action(1, "/a")]).passed);
        assert!(!assert_conflicts_keep_actions(&[conflict(1)], &[]).passed);
    }
}
