//! Show sync status.

use anyhow::Result;
use std::collections::BTreeMap;

use super::format_age;
use crate::config::CliContext;

/// Run the status command.
pub async fn run(ctx: &CliContext) -> Result<()> {
    println!("=== carelog status ===");
    println!();

    println!("Local store:");
    println!("  Data dir: {}", ctx.data_dir.display());
    println!("  Database: {}", ctx.database.display());
    println!();

    let actions = ctx.queue.list_all().await?;
    println!("Queue: {} pending", actions.len());
    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for action in &actions {
        *by_type.entry(action.action_type.as_str()).or_default() += 1;
    }
    for (action_type, count) in &by_type {
        println!("  {action_type}: {count}");
    }
    if let Some(oldest) = actions.iter().map(|a| a.enqueued_at).min() {
        println!("  Oldest: {}", format_age(oldest));
    }
    println!();

    let counts = ctx.conflicts.count_unresolved().await?;
    println!("Conflicts:");
    println!("  Unresolved: {}", counts.unresolved);
    println!("  Resolved:   {}", counts.total - counts.unresolved);
    println!();

    let prefs = &ctx.config.auto_resolution;
    println!("Server:");
    match &ctx.config.server.base_url {
        Some(url) => println!("  URL: {url}"),
        None => println!("  URL: NOT CONFIGURED (actions must use absolute URLs)"),
    }
    println!();
    println!("Auto-resolution:");
    println!("  Enabled:      {}", prefs.enabled);
    println!("  Single field: {}", prefs.allow_single_field_auto);
    println!("  Multi field:  {}", prefs.allow_multi_field_auto);
    println!("  Merge:        {}", prefs.allow_auto_merge);
    println!("  Threshold:    {}s", prefs.time_difference_threshold_secs);

    Ok(())
}
