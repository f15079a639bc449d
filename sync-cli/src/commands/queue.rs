//! Inspect and manage the pending action queue.

use anyhow::{bail, Result};
use sync_types::ActionId;

use super::{format_age, render};
use crate::config::CliContext;

/// List queued actions in replay order.
pub async fn list(ctx: &CliContext, verbose: bool) -> Result<()> {
    let actions = ctx.queue.list_all().await?;
    if actions.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }

    for action in &actions {
        let conflict = ctx.conflicts.find_for_action(action.id).await?;
        println!(
            "[{}] {} {} {} ({}){}",
            action.id,
            action.method,
            action.action_type,
            action.target_url,
            format_age(action.enqueued_at),
            if conflict.is_some() { " CONFLICT" } else { "" }
        );
        if verbose {
            println!("      body: {}", render(&action.body));
        }
    }
    println!();
    println!("{} action(s) pending", actions.len());
    Ok(())
}

/// Replay one action, skipping the conflict check.
pub async fn force(ctx: &CliContext, id: ActionId) -> Result<()> {
    if ctx.queue.get(id).await?.is_none() {
        bail!("No queued action {id}");
    }
    if ctx.orchestrator()?.force_replay(id).await? {
        println!("Replayed action {id}");
        Ok(())
    } else {
        bail!("Replay of action {id} failed; it stays queued")
    }
}

/// Drop one action without replaying it.
pub async fn discard(ctx: &CliContext, id: ActionId) -> Result<()> {
    if !ctx.orchestrator()?.discard(id).await? {
        bail!("No queued action {id}");
    }
    println!("Discarded action {id}");
    Ok(())
}
