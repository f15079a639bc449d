//! Per-action replay state machine.
//!
//! This module provides a pure, side-effect-free state machine for one
//! pending action during a sync run. It takes events as input and produces
//! a new state plus a list of steps to execute.
//!
//! The actual I/O (fetching server state, replaying the request, touching
//! the queue and conflict store) is performed by sync-client, not by this
//! module.

use sync_types::{ConflictKind, Resolution};

/// Where an action is in its replay lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    /// Waiting in the queue.
    #[default]
    Queued,
    /// Fetching the current server record.
    Checking,
    /// A conflict was detected; waiting for the auto-resolution verdict.
    Evaluating {
        /// Detected kind.
        kind: ConflictKind,
    },
    /// Request is being replayed.
    Replaying {
        /// Whether the replay applies an automatic resolution.
        auto_resolved: bool,
    },
    /// Finished for this run.
    Done(ActionOutcome),
}

/// How an action finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionOutcome {
    /// Replayed and removed from the queue.
    Success,
    /// A conflict was settled silently; the action is gone.
    AutoResolved,
    /// A conflict was recorded; the action stays queued.
    Conflict,
    /// Transport failure; the action stays queued for retry.
    Failed,
    /// Dropped without replay.
    Discarded,
}

impl ActionOutcome {
    /// Whether the action left the queue.
    pub fn removes_action(self) -> bool {
        matches!(self, Self::Success | Self::AutoResolved | Self::Discarded)
    }
}

/// Events that drive an action through a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionEvent {
    /// Sync run reached this action.
    SyncRequested {
        /// Whether the action must be checked against the server first.
        check: bool,
    },
    /// Replay requested regardless of conflicts.
    ForceReplayRequested,
    /// Action dropped by the user.
    DiscardRequested,
    /// Server state does not conflict.
    NoConflict,
    /// A delete found the resource already gone.
    AlreadyDeleted,
    /// Server state conflicts.
    ConflictDetected {
        /// Detected kind.
        kind: ConflictKind,
    },
    /// The auto-resolution engine settled the conflict.
    AutoResolved {
        /// Chosen resolution.
        resolution: Resolution,
    },
    /// The auto-resolution engine deferred to the user.
    ManualReviewRequired,
    /// Server accepted the replay.
    ReplaySucceeded,
    /// Server reported the resource missing during a checked replay.
    ResourceMissing,
    /// Network or server failure.
    TransportFailed {
        /// Error message describing the failure.
        error: String,
    },
}

/// Steps to be executed by sync-client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStep {
    /// Fetch the current server record.
    FetchServerState,
    /// Ask the auto-resolution engine for a verdict.
    EvaluateConflict,
    /// Send the request (or the resolved body) to the server.
    Replay,
    /// Delete the action from the queue.
    RemoveFromQueue,
    /// Persist a conflict entry for review.
    RecordConflict {
        /// Kind to record.
        kind: ConflictKind,
    },
    /// Report a failure; the action stays queued.
    ReportFailure {
        /// Error message describing the failure.
        error: String,
    },
}

impl ActionState {
    /// A fresh queued action.
    pub fn new() -> Self {
        Self::Queued
    }

    /// Process an event and return the new state plus steps to execute.
    pub fn on_event(self, event: ActionEvent) -> (Self, Vec<ActionStep>) {
        use ActionEvent as E;
        use ActionStep as S;

        match (self, event) {
            // From Queued
            (Self::Queued, E::SyncRequested { check: true }) => {
                (Self::Checking, vec![S::FetchServerState])
            }
            (Self::Queued, E::SyncRequested { check: false } | E::ForceReplayRequested) => (
                Self::Replaying {
                    auto_resolved: false,
                },
                vec![S::Replay],
            ),
            (Self::Queued, E::DiscardRequested) => (
                Self::Done(ActionOutcome::Discarded),
                vec![S::RemoveFromQueue],
            ),

            // From Checking
            (Self::Checking, E::NoConflict) => (
                Self::Replaying {
                    auto_resolved: false,
                },
                vec![S::Replay],
            ),
            (Self::Checking, E::AlreadyDeleted) => (
                Self::Done(ActionOutcome::Success),
                vec![S::RemoveFromQueue],
            ),
            (Self::Checking, E::ConflictDetected { kind }) => {
                (Self::Evaluating { kind }, vec![S::EvaluateConflict])
            }

            // From Evaluating
            (Self::Evaluating { .. }, E::AutoResolved { resolution }) => match resolution {
                Resolution::KeepServer => (
                    Self::Done(ActionOutcome::AutoResolved),
                    vec![S::RemoveFromQueue],
                ),
                Resolution::KeepLocal | Resolution::Merge => (
                    Self::Replaying {
                        auto_resolved: true,
                    },
                    vec![S::Replay],
                ),
            },
            (Self::Evaluating { kind }, E::ManualReviewRequired) => (
                Self::Done(ActionOutcome::Conflict),
                vec![S::RecordConflict { kind }],
            ),

            // From Replaying
            (Self::Replaying { auto_resolved }, E::ReplaySucceeded) => {
                let outcome = if auto_resolved {
                    ActionOutcome::AutoResolved
                } else {
                    ActionOutcome::Success
                };
                (Self::Done(outcome), vec![S::RemoveFromQueue])
            }
            (Self::Replaying { .. }, E::ResourceMissing) => (
                Self::Done(ActionOutcome::Conflict),
                vec![S::RecordConflict {
                    kind: ConflictKind::DeleteConflict,
                }],
            ),

            // Failures while talking to the server
            (Self::Checking | Self::Replaying { .. }, E::TransportFailed { error }) => (
                Self::Done(ActionOutcome::Failed),
                vec![S::ReportFailure { error }],
            ),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if the action is finished for this run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// The outcome, once finished.
    pub fn outcome(&self) -> Option<ActionOutcome> {
        match self {
            Self::Done(outcome) => Some(*outcome),
            _ => None,
        }
    }
}
