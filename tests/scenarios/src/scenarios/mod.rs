//! Sync scenarios for carelog.
//!
//! - `offline` - restarts between enqueue and sync
//! - `network` - failures, latency and interrupted runs
//! - `resolution` - concurrent server edits and how they settle

mod network;
mod offline;
mod resolution;

use chrono::{Duration, Utc};
use sync_types::{ActionType, FieldValue, Method, PendingActionInput, Record};

/// A new medication log.
pub(crate) fn create_log(url: &str, status: &str) -> PendingActionInput {
    PendingActionInput::new(
        ActionType::LogEntry,
        Method::Create,
        url,
        Record::new().with("status", status),
    )
}

/// An edit of an existing record.
pub(crate) fn edit(action_type: ActionType, url: &str, id: &str, body: Record) -> PendingActionInput {
    PendingActionInput::new(action_type, Method::Update, url, body).with_resource_id(id)
}

/// A server timestamp `secs` from now.
pub(crate) fn server_time(secs: i64) -> FieldValue {
    FieldValue::Timestamp(Utc::now() + Duration::seconds(secs))
}
