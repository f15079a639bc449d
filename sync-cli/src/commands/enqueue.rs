//! Queue a mutation for later replay.

use anyhow::{Context, Result};
use sync_types::{ActionId, ActionType, Method, PendingActionInput, Record};

use crate::config::CliContext;

/// A mutation as given on the command line.
#[derive(Debug, Clone)]
pub struct EnqueueArgs {
    /// Payload kind.
    pub action_type: ActionType,
    /// Replay method.
    pub method: Method,
    /// Target URL.
    pub url: String,
    /// Identifier of the edited resource.
    pub resource_id: Option<String>,
    /// JSON object body.
    pub body: String,
    /// Extra headers as `Name: value`.
    pub headers: Vec<String>,
}

/// Run the enqueue command.
pub async fn run(ctx: &CliContext, args: EnqueueArgs) -> Result<ActionId> {
    let json: serde_json::Value =
        serde_json::from_str(&args.body).context("Body is not valid JSON")?;
    let body = Record::from_json(json).context("Body must be a JSON object")?;

    let mut input = PendingActionInput::new(args.action_type, args.method, args.url, body);
    if let Some(id) = args.resource_id {
        input = input.with_resource_id(id);
    }
    for header in &args.headers {
        let (name, value) = parse_header(header)?;
        input = input.with_header(name, value);
    }

    let id = ctx.queue.enqueue(input).await?;
    println!("Queued action {id}");
    Ok(id)
}

fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("Header must look like 'Name: value', got '{raw}'"))?;
    Ok((name.trim(), value.trim()))
}
