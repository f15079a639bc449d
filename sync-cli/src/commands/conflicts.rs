//! Review and resolve conflicts.

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use sync_core::{AutoResolutionEngine, ConflictInput, FieldSource};
use sync_types::{ConflictEntry, ConflictId, Resolution};

use super::{format_age, render};
use crate::config::CliContext;

async fn load(ctx: &CliContext, id: ConflictId) -> Result<ConflictEntry> {
    ctx.conflicts
        .get(id)
        .await?
        .with_context(|| format!("No conflict {id}"))
}

/// List conflicts, unresolved only unless `all`.
pub async fn list(ctx: &CliContext, all: bool) -> Result<()> {
    let conflicts = if all {
        ctx.conflicts.list_all().await?
    } else {
        ctx.conflicts.list_unresolved().await?
    };
    if conflicts.is_empty() {
        println!("No conflicts.");
        return Ok(());
    }

    for conflict in &conflicts {
        let state = match conflict.resolution {
            Some(resolution) => resolution.to_string(),
            None => "open".to_string(),
        };
        println!(
            "{} {} {} action {} ({}) [{}]",
            conflict.id,
            conflict.conflict_kind,
            conflict.resource_type,
            conflict.source_action_id,
            format_age(conflict.created_at),
            state
        );
    }
    Ok(())
}

/// Show both versions and the differing fields.
pub async fn show(ctx: &CliContext, id: ConflictId) -> Result<()> {
    let conflict = load(ctx, id).await?;
    let engine = AutoResolutionEngine::new(ctx.config.strategy_table());

    println!("Conflict {}", conflict.id);
    println!("  Kind:     {}", conflict.conflict_kind);
    println!("  Resource: {}", conflict.resource_type);
    println!("  Action:   {}", conflict.source_action_id);
    println!("  Local:    {}", conflict.local_timestamp.to_rfc3339());
    match conflict.server_timestamp {
        Some(ts) => println!("  Server:   {}", ts.to_rfc3339()),
        None => println!("  Server:   unknown"),
    }
    println!();
    println!("Local data:  {}", render(&conflict.local_data));

    let Some(server) = &conflict.server_data else {
        println!("Server data: (deleted)");
        return Ok(());
    };
    println!("Server data: {}", render(server));
    println!();

    for diff in engine.differing_fields(&conflict.local_data, server) {
        println!(
            "  {:<20} local={:<24} server={:<24} [{}]",
            diff.field,
            diff.local_value.map_or("-".to_string(), |v| format!("{v:?}")),
            diff.server_value.map_or("-".to_string(), |v| format!("{v:?}")),
            diff.strategy
        );
    }

    let verdict = engine.evaluate(
        ConflictInput {
            local: &conflict.local_data,
            server: Some(server),
            kind: conflict.conflict_kind,
            local_timestamp: conflict.local_timestamp,
        },
        &ctx.config.auto_resolution,
    );
    println!();
    println!("Auto-resolution: {}", verdict.reason);
    Ok(())
}

/// Show the field-by-field merge.
pub async fn preview(ctx: &CliContext, id: ConflictId) -> Result<()> {
    let conflict = load(ctx, id).await?;
    let Some(merge) = ctx.orchestrator()?.get_merge_preview(&conflict) else {
        println!("Resource was deleted on the server; nothing to merge.");
        return Ok(());
    };

    for decision in &merge.field_decisions {
        let source = match decision.source {
            FieldSource::Local => "local",
            FieldSource::Server => "server",
            FieldSource::Merged => "merged",
        };
        println!("  {:<20} <- {:<6} [{}]", decision.field, source, decision.strategy);
    }
    println!();
    println!("Merged: {}", render(&merge.merged_data));
    if !merge.has_changes {
        println!("(identical to the server copy)");
    }
    Ok(())
}

/// Apply a decision.
pub async fn resolve(ctx: &CliContext, id: ConflictId, resolution: Resolution) -> Result<()> {
    let entry = ctx.orchestrator()?.resolve_conflict(id, resolution).await?;
    println!(
        "Resolved conflict {} with {}",
        entry.id,
        entry.resolution.unwrap_or(resolution)
    );
    Ok(())
}

/// Delete resolved conflicts, optionally only those older than a number of seconds.
pub async fn clear_resolved(ctx: &CliContext, older_than_secs: Option<u64>) -> Result<()> {
    let removed = match older_than_secs {
        Some(secs) => {
            let age = i64::try_from(secs).context("Age is too large")?;
            ctx.conflicts
                .clear_resolved_before(Utc::now() - Duration::seconds(age))
                .await?
        }
        None => ctx.conflicts.clear_resolved().await?,
    };
    println!("Removed {removed} resolved conflict(s)");
    Ok(())
}

/// Delete one conflict without resolving it.
pub async fn delete(ctx: &CliContext, id: ConflictId) -> Result<()> {
    if !ctx.conflicts.delete(id).await? {
        bail!("No conflict {id}");
    }
    println!("Deleted conflict {id}");
    Ok(())
}
