//! Sync orchestrator.
//!
//! Replays the pending action queue against the server. Each action is
//! driven through the pure [`ActionState`] machine from sync-core; this
//! module interprets the resulting steps and performs the I/O.
//!
//! ```text
//! PendingActionQueue → SyncOrchestrator → Transport → Server
//!                           ↓      ↓
//!                sync-core     ConflictStore
//! ```
//!
//! Only one run may hold the queue at a time. A second concurrent
//! [`replay_all`](SyncOrchestrator::replay_all) returns
//! [`ClientError::SyncInProgress`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use sync_core::{
    detect, ActionEvent, ActionOutcome, ActionState, ActionStep, AutoResolutionEngine,
    AutoResolutionPreferences, ConflictInput, MergeResult, StrategyTable,
};
use sync_types::{
    ActionId, ConflictEntry, ConflictId, ConflictKind, Method, PendingAction, Record, Resolution,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::PreferencesSource;
use crate::conflicts::ConflictStore;
use crate::error::{ClientError, Result};
use crate::notify::{self, ConflictNotifier};
use crate::queue::PendingActionQueue;
use crate::transport::{Transport, TransportError};

/// Totals for one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    /// Actions replayed or settled and removed from the queue.
    pub success: usize,
    /// Actions left queued after a transport failure.
    pub failed: usize,
    /// Actions left queued with a conflict awaiting review.
    pub conflicts: usize,
    /// Conflicts reported by this run, in queue order.
    pub conflict_ids: Vec<ConflictId>,
    /// Of `success`, how many settled a conflict automatically.
    pub auto_resolved: usize,
    /// Whether the run stopped early on request.
    pub aborted: bool,
}

/// Requests that a running sync stops before its next action.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Ask the current run to stop.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Per-action scratch data while stepping through the state machine.
struct ActionRun<'a> {
    action: &'a PendingAction,
    check: bool,
    server: Option<Record>,
    kind: Option<ConflictKind>,
    replay_body: Option<Record>,
    conflict_id: Option<ConflictId>,
    failure: Option<TransportError>,
}

impl<'a> ActionRun<'a> {
    fn new(action: &'a PendingAction, check: bool) -> Self {
        Self {
            action,
            check,
            server: None,
            kind: None,
            replay_body: None,
            conflict_id: None,
            failure: None,
        }
    }
}

/// Replays queued actions and routes conflicts.
pub struct SyncOrchestrator<T> {
    queue: PendingActionQueue,
    conflicts: ConflictStore,
    transport: T,
    engine: AutoResolutionEngine,
    preferences: Arc<dyn PreferencesSource>,
    notifier: Option<Arc<dyn ConflictNotifier>>,
    run_lock: Mutex<()>,
    abort: AbortHandle,
}

impl<T> std::fmt::Debug for SyncOrchestrator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("queue", &self.queue)
            .field("conflicts", &self.conflicts)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> SyncOrchestrator<T> {
    /// Create an orchestrator with the standard strategy table and default
    /// preferences.
    pub fn new(queue: PendingActionQueue, conflicts: ConflictStore, transport: T) -> Self {
        Self {
            queue,
            conflicts,
            transport,
            engine: AutoResolutionEngine::new(StrategyTable::standard()),
            preferences: Arc::new(AutoResolutionPreferences::default()),
            notifier: None,
            run_lock: Mutex::new(()),
            abort: AbortHandle::default(),
        }
    }

    /// Use a custom strategy table.
    pub fn with_strategy_table(mut self, table: StrategyTable) -> Self {
        self.engine = AutoResolutionEngine::new(table);
        self
    }

    /// Read preferences from the given source.
    pub fn with_preferences(mut self, preferences: Arc<dyn PreferencesSource>) -> Self {
        self.preferences = preferences;
        self
    }

    /// Alert the given notifier whenever a conflict is recorded.
    pub fn with_notifier(mut self, notifier: Arc<dyn ConflictNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// The pending action queue.
    pub fn queue(&self) -> &PendingActionQueue {
        &self.queue
    }

    /// The conflict store.
    pub fn conflicts(&self) -> &ConflictStore {
        &self.conflicts
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Handle for stopping a run between actions.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Replay every queued action in enqueue order.
    ///
    /// Transport failures and conflicts are counted, not returned; only
    /// storage failures abort the run with an error.
    pub async fn replay_all(&self, skip_conflict_check: bool) -> Result<SyncResult> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| ClientError::SyncInProgress)?;
        self.abort.reset();

        let actions = self.queue.list_all().await?;
        info!(
            queued = actions.len(),
            skip_conflict_check, "starting sync run"
        );

        let mut result = SyncResult::default();
        for action in &actions {
            if self.abort.is_aborted() {
                info!(action_id = %action.id, "sync run aborted");
                result.aborted = true;
                break;
            }

            let check = !skip_conflict_check && action.needs_conflict_check();

            if check {
                if let Some(existing) = self.conflicts.find_for_action(action.id).await? {
                    debug!(
                        action_id = %action.id,
                        conflict_id = %existing.id,
                        "action already has an open conflict"
                    );
                    result.conflicts += 1;
                    result.conflict_ids.push(existing.id);
                    continue;
                }
            }

            let mut run = ActionRun::new(action, check);
            let outcome = self
                .drive(&mut run, ActionEvent::SyncRequested { check })
                .await?;

            match outcome {
                ActionOutcome::Success => result.success += 1,
                ActionOutcome::AutoResolved => {
                    result.success += 1;
                    result.auto_resolved += 1;
                }
                ActionOutcome::Conflict => {
                    result.conflicts += 1;
                    result.conflict_ids.extend(run.conflict_id);
                }
                ActionOutcome::Failed => result.failed += 1,
                ActionOutcome::Discarded => {}
            }
        }

        info!(
            success = result.success,
            failed = result.failed,
            conflicts = result.conflicts,
            auto_resolved = result.auto_resolved,
            aborted = result.aborted,
            "sync run finished"
        );
        Ok(result)
    }

    /// Replay one action without checking server state.
    ///
    /// Returns `true` if the server accepted it (the action is then removed),
    /// `false` if the action does not exist or the replay failed.
    pub async fn force_replay(&self, id: ActionId) -> Result<bool> {
        let _guard = self.run_lock.lock().await;
        let Some(action) = self.queue.get(id).await? else {
            return Ok(false);
        };

        let mut run = ActionRun::new(&action, false);
        let outcome = self.drive(&mut run, ActionEvent::ForceReplayRequested).await?;
        Ok(outcome.removes_action())
    }

    /// Remove an action without replaying it. Returns whether it existed.
    pub async fn discard(&self, id: ActionId) -> Result<bool> {
        let _guard = self.run_lock.lock().await;
        let Some(action) = self.queue.get(id).await? else {
            return Ok(false);
        };

        let mut run = ActionRun::new(&action, false);
        self.drive(&mut run, ActionEvent::DiscardRequested).await?;
        info!(action_id = %id, "discarded queued action");
        Ok(true)
    }

    /// Apply a user's decision to a conflict.
    ///
    /// `KeepLocal` force-replays the source action, `KeepServer` discards it
    /// and `Merge` replays the merge preview. The conflict is marked resolved
    /// only after that succeeds; on failure it stays open and the error is
    /// returned.
    pub async fn resolve_conflict(
        &self,
        id: ConflictId,
        resolution: Resolution,
    ) -> Result<ConflictEntry> {
        let _guard = self.run_lock.lock().await;
        let conflict = self
            .conflicts
            .get(id)
            .await?
            .ok_or_else(|| ClientError::conflict_not_found(id))?;
        if conflict.resolved {
            debug!(conflict_id = %id, "conflict already resolved");
            return Ok(conflict);
        }

        let action = self.queue.get(conflict.source_action_id).await?;

        match (resolution, action) {
            (Resolution::KeepServer, Some(action)) => {
                let mut run = ActionRun::new(&action, false);
                self.drive(&mut run, ActionEvent::DiscardRequested).await?;
            }
            (Resolution::KeepServer, None) => {}
            (Resolution::KeepLocal | Resolution::Merge, None) => {
                return Err(ClientError::action_not_found(conflict.source_action_id));
            }
            (Resolution::KeepLocal | Resolution::Merge, Some(action)) => {
                let mut run = ActionRun::new(&action, false);
                if resolution == Resolution::Merge {
                    run.replay_body = self.get_merge_preview(&conflict).map(|m| m.merged_data);
                }
                let outcome = self.drive(&mut run, ActionEvent::ForceReplayRequested).await?;
                if !outcome.removes_action() {
                    let error = run
                        .failure
                        .unwrap_or_else(|| TransportError::InvalidResponse("replay rejected".into()));
                    return Err(error.into());
                }
            }
        }

        self.conflicts.resolve(id, resolution).await
    }

    /// Field-by-field merge of a conflict, for display.
    ///
    /// `None` when the server copy is gone.
    pub fn get_merge_preview(&self, conflict: &ConflictEntry) -> Option<MergeResult> {
        let server = conflict.server_data.as_ref()?;
        Some(
            self.engine
                .merger()
                .merge(&conflict.local_data, server, conflict.local_timestamp),
        )
    }

    /// Step one action through the state machine until it settles.
    async fn drive(&self, run: &mut ActionRun<'_>, first: ActionEvent) -> Result<ActionOutcome> {
        let mut state = ActionState::new();
        let mut events = VecDeque::from([first]);

        while let Some(event) = events.pop_front() {
            let (next, steps) = state.on_event(event);
            debug!(action_id = %run.action.id, from = ?state, to = ?next, "action transition");
            state = next;

            for step in steps {
                if let Some(event) = self.execute(run, step).await? {
                    events.push_back(event);
                }
            }
        }

        // Every path through the machine ends in Done; Failed covers a
        // rejected first event.
        Ok(state.outcome().unwrap_or(ActionOutcome::Failed))
    }

    /// Perform one step, returning the event it produced.
    async fn execute(&self, run: &mut ActionRun<'_>, step: ActionStep) -> Result<Option<ActionEvent>> {
        let action = run.action;
        let event = match step {
            ActionStep::FetchServerState => {
                let resource_id = action.resource_id.as_deref().unwrap_or_default();
                match self
                    .transport
                    .fetch_current(resource_id, &action.target_url, &action.headers)
                    .await
                {
                    Ok(server) => {
                        run.server = server;
                        Some(self.classify(run))
                    }
                    Err(e) => {
                        run.failure = Some(e.clone());
                        Some(ActionEvent::TransportFailed {
                            error: e.to_string(),
                        })
                    }
                }
            }

            ActionStep::EvaluateConflict => Some(self.evaluate(run)),

            ActionStep::Replay => Some(self.replay(run).await),

            ActionStep::RemoveFromQueue => {
                self.queue.remove(action.id).await?;
                None
            }

            ActionStep::RecordConflict { kind } => {
                self.record_conflict(run, kind).await?;
                None
            }

            ActionStep::ReportFailure { error } => {
                warn!(action_id = %action.id, %error, "action replay failed; will retry");
                None
            }
        };
        Ok(event)
    }

    fn classify(&self, run: &mut ActionRun<'_>) -> ActionEvent {
        let action = run.action;
        if run.server.is_none() && action.method == Method::Delete {
            debug!(action_id = %action.id, "resource already deleted on server");
            return ActionEvent::AlreadyDeleted;
        }

        run.kind = detect(&action.body, run.server.as_ref(), action.enqueued_at).kind;
        match run.kind {
            Some(kind) => ActionEvent::ConflictDetected { kind },
            None => ActionEvent::NoConflict,
        }
    }

    fn evaluate(&self, run: &mut ActionRun<'_>) -> ActionEvent {
        let action = run.action;
        let Some(kind) = run.kind else {
            return ActionEvent::ManualReviewRequired;
        };

        let prefs = self.preferences.preferences();
        let verdict = self.engine.evaluate(
            ConflictInput {
                local: &action.body,
                server: run.server.as_ref(),
                kind,
                local_timestamp: action.enqueued_at,
            },
            &prefs,
        );

        let resolution = match verdict.resolution {
            Some(resolution) if verdict.can_auto_resolve => resolution,
            _ => {
                debug!(action_id = %action.id, reason = %verdict.reason, "conflict needs review");
                return ActionEvent::ManualReviewRequired;
            }
        };

        // A merged body has no meaning for a delete.
        if resolution == Resolution::Merge && action.method == Method::Delete {
            return ActionEvent::ManualReviewRequired;
        }

        info!(
            action_id = %action.id,
            %resolution,
            reason = %verdict.reason,
            "conflict auto-resolved"
        );
        if resolution == Resolution::Merge {
            run.replay_body = verdict.resolved_data;
        }
        ActionEvent::AutoResolved { resolution }
    }

    async fn replay(&self, run: &mut ActionRun<'_>) -> ActionEvent {
        let action = run.action;
        let body = match action.method {
            Method::Delete => None,
            _ => Some(run.replay_body.as_ref().unwrap_or(&action.body)),
        };

        match self
            .transport
            .submit(action.method, &action.target_url, &action.headers, body)
            .await
        {
            Ok(()) => {
                debug!(action_id = %action.id, "replayed action");
                ActionEvent::ReplaySucceeded
            }
            Err(e) if e.is_not_found() && action.method == Method::Delete => {
                debug!(action_id = %action.id, "resource already deleted on server");
                ActionEvent::ReplaySucceeded
            }
            Err(e) if e.is_not_found() && run.check => {
                run.server = None;
                ActionEvent::ResourceMissing
            }
            Err(e) => {
                run.failure = Some(e.clone());
                ActionEvent::TransportFailed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn record_conflict(&self, run: &mut ActionRun<'_>, kind: ConflictKind) -> Result<()> {
        let action = run.action;
        let Some(resource_type) = action.action_type.resource_type() else {
            warn!(action_id = %action.id, "conflict on an action without a resource type");
            return Ok(());
        };

        let entry = ConflictEntry::new(
            resource_type,
            action.body.clone(),
            run.server.clone(),
            kind,
            action.enqueued_at,
            action.id,
        );
        let id = self.conflicts.create(&entry).await?;
        run.conflict_id = Some(id);

        if let Some(notifier) = &self.notifier {
            notify::dispatch(Arc::clone(notifier), entry);
        }
        Ok(())
    }
}
