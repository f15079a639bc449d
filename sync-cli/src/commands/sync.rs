//! Replay the queue against the server.

use anyhow::Result;
use sync_client::{purge_resolved, SyncResult};

use crate::config::CliContext;

/// Run the sync command.
pub async fn run(ctx: &CliContext, skip_conflict_check: bool) -> Result<SyncResult> {
    let orchestrator = ctx.orchestrator()?;

    // Ctrl-C stops the run after the action in flight.
    let abort = orchestrator.abort_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted; stopping after the current action");
            abort.abort();
        }
    });

    let result = orchestrator.replay_all(skip_conflict_check).await;
    interrupt.abort();
    let result = result?;

    println!("Replayed:      {}", result.success);
    println!("Auto-resolved: {}", result.auto_resolved);
    println!("Conflicts:     {}", result.conflicts);
    println!("Failed:        {}", result.failed);
    for id in &result.conflict_ids {
        println!("  conflict {id}");
    }
    if result.aborted {
        println!("Sync aborted; remaining actions stay queued.");
    }
    if result.conflicts > 0 {
        println!();
        println!("Run 'carelog conflicts list' to review.");
    }

    if ctx.config.cleanup.enabled {
        let purged = purge_resolved(&ctx.conflicts, ctx.config.cleanup.retention_secs).await?;
        tracing::debug!(purged, "purged old resolved conflicts");
    }

    Ok(result)
}
