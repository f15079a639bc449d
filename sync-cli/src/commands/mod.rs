//! CLI command implementations.

pub mod conflicts;
pub mod enqueue;
pub mod queue;
pub mod status;
pub mod sync;

use chrono::{DateTime, Utc};
use sync_types::Record;

/// Format a point in time relative to now.
pub fn format_age(at: DateTime<Utc>) -> String {
    let diff = (Utc::now() - at).num_seconds().max(0);

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}

/// Render a record as compact JSON.
pub fn render(record: &Record) -> String {
    record.to_json().to_string()
}
