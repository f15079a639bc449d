//! Background cleanup task for resolved conflicts.
//!
//! Runs periodically to delete conflicts resolved longer ago than the
//! configured retention.

use crate::config::CleanupConfig;
use crate::conflicts::ConflictStore;
use crate::error::Result;
use chrono::Utc;
use std::time::Duration;
use tokio::time::interval;

/// Delete conflicts resolved more than `retention_secs` ago.
///
/// A retention reaching back past the earliest representable time keeps
/// everything.
pub async fn purge_resolved(conflicts: &ConflictStore, retention_secs: u64) -> Result<u64> {
    let cutoff = i64::try_from(retention_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .and_then(|retention| Utc::now().checked_sub_signed(retention));
    match cutoff {
        Some(cutoff) => conflicts.clear_resolved_before(cutoff).await,
        None => {
            tracing::debug!(retention_secs, "retention out of range; keeping resolved conflicts");
            Ok(0)
        }
    }
}

/// Spawn a background cleanup task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_task(
    conflicts: ConflictStore,
    config: CleanupConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Cleanup task disabled");
            return;
        }

        let interval_secs = config.interval_secs.max(1);
        tracing::info!("Cleanup task started (interval: {}s)", interval_secs);

        let mut timer = interval(Duration::from_secs(interval_secs));

        loop {
            timer.tick().await;

            match purge_resolved(&conflicts, config.retention_secs).await {
                Ok(deleted) => {
                    if deleted > 0 {
                        tracing::info!("Cleanup: deleted {} resolved conflicts", deleted);
                    } else {
                        tracing::debug!("Cleanup: no resolved conflicts past retention");
                    }
                }
                Err(e) => {
                    tracing::error!("Cleanup error: {}", e);
                }
            }
        }
    })
}
