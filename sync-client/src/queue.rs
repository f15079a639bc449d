//! Pending action queue.
//!
//! Persists mutations made while offline. Ids come from a store sequence
//! and are zero-padded into keys, so a scan returns actions in enqueue order.

use chrono::Utc;
use std::sync::Arc;
use sync_store::{Collection, Store};
use sync_types::{ActionId, PendingAction, PendingActionInput};
use tracing::{debug, info};

use crate::auth::{bearer, CredentialProvider, AUTHORIZATION};
use crate::error::Result;

/// Store collection holding queued actions.
pub const QUEUE_COLLECTION: &str = "pending_actions";

/// Durable FIFO of pending actions.
#[derive(Clone)]
pub struct PendingActionQueue {
    actions: Collection<PendingAction>,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl std::fmt::Debug for PendingActionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingActionQueue")
            .field("actions", &self.actions)
            .field("credentials", &self.credentials.is_some())
            .finish()
    }
}

impl PendingActionQueue {
    /// Open the queue on a store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            actions: Collection::new(store, QUEUE_COLLECTION),
            credentials: None,
        }
    }

    /// Attach bearer credentials to actions that carry none.
    pub fn with_credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    /// Validate, stamp and persist an action.
    ///
    /// Fails only on invalid input or storage errors; never on network state.
    pub async fn enqueue(&self, mut input: PendingActionInput) -> Result<ActionId> {
        input.validate()?;

        if !input.has_header(AUTHORIZATION) {
            if let Some(provider) = &self.credentials {
                if let Some(token) = provider.bearer_token().await {
                    input.headers.insert(AUTHORIZATION.to_string(), bearer(&token));
                }
            }
        }

        let id = ActionId::new(self.actions.next_id().await?);
        let action = input.into_action(id, Utc::now());
        self.actions
            .put(&id.key(), &action, &[("action_type", action.action_type.to_string())])
            .await?;

        info!(
            action_id = %id,
            action_type = %action.action_type,
            method = %action.method,
            "queued offline action"
        );
        Ok(id)
    }

    /// All queued actions in enqueue order.
    pub async fn list_all(&self) -> Result<Vec<PendingAction>> {
        Ok(self.actions.scan().await?)
    }

    /// One queued action.
    pub async fn get(&self, id: ActionId) -> Result<Option<PendingAction>> {
        Ok(self.actions.get(&id.key()).await?)
    }

    /// Remove an action. Removing an absent id is not an error.
    pub async fn remove(&self, id: ActionId) -> Result<bool> {
        let removed = self.actions.delete(&id.key()).await?;
        debug!(action_id = %id, removed, "removed queued action");
        Ok(removed)
    }

    /// Remove every action.
    pub async fn clear(&self) -> Result<u64> {
        let removed = self.actions.clear().await?;
        info!(removed, "cleared action queue");
        Ok(removed)
    }

    /// Number of queued actions.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.actions.scan().await?.len())
    }
}
