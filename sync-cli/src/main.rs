//! # carelog
//!
//! CLI tool for driving carelog offline sync.
//!
//! ## Commands
//!
//! - `enqueue`: Queue a mutation for later replay
//! - `list`: Show queued actions
//! - `sync`: Replay the queue against the server
//! - `force` / `discard`: Replay or drop a single action
//! - `conflicts`: Review and resolve conflicts
//! - `status`: Show queue, conflict and configuration summary
//!
//! ## Example
//!
//! ```bash
//! # Record an edit while offline
//! carelog enqueue --type log_entry --method update --url /api/logs/42 \
//!     --id 42 --body '{"status":"taken"}'
//!
//! # Replay once back online
//! carelog --server https://api.example.com sync
//!
//! # Review what could not be settled automatically
//! carelog conflicts list
//! carelog conflicts resolve <id> keep_local
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use sync_types::{ActionId, ActionType, ConflictId, Method, Resolution};

mod commands;
mod config;

use commands::{conflicts, enqueue, queue, status, sync};
use config::{CliContext, CliOptions};

/// CLI tool for driving carelog offline sync.
#[derive(Parser, Debug)]
#[command(name = "carelog")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for the local database and config file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: <data-dir>/carelog.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server base URL, overriding the config file
    #[arg(long, global = true, env = "CARELOG_SERVER")]
    server: Option<String>,

    /// Bearer token attached to newly queued actions
    #[arg(long, global = true, env = "CARELOG_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Queue a mutation for later replay
    Enqueue {
        /// Payload kind (log_entry, symptom_entry, message)
        #[arg(long = "type", short = 't')]
        action_type: ActionType,

        /// Replay method (create, update, replace, delete)
        #[arg(long, short)]
        method: Method,

        /// Target URL
        #[arg(long, short)]
        url: String,

        /// Identifier of the edited resource
        #[arg(long)]
        id: Option<String>,

        /// JSON object body
        #[arg(long, short, default_value = "{}")]
        body: String,

        /// Extra header as 'Name: value' (repeatable)
        #[arg(long = "header", short = 'H')]
        headers: Vec<String>,
    },

    /// Show queued actions
    List {
        /// Also print each action's body
        #[arg(long, short)]
        verbose: bool,
    },

    /// Replay the queue against the server
    Sync {
        /// Replay without checking server state first
        #[arg(long)]
        skip_check: bool,
    },

    /// Replay one action without a conflict check
    Force {
        /// Action id
        id: ActionId,
    },

    /// Drop one action without replaying it
    Discard {
        /// Action id
        id: ActionId,
    },

    /// Review and resolve conflicts
    #[command(subcommand)]
    Conflicts(ConflictCommands),

    /// Show queue, conflict and configuration summary
    Status,
}

#[derive(Subcommand, Debug)]
enum ConflictCommands {
    /// List conflicts
    List {
        /// Include resolved conflicts
        #[arg(long)]
        all: bool,
    },

    /// Show both versions of a conflict
    Show {
        /// Conflict id
        id: ConflictId,
    },

    /// Show the field-by-field merge of a conflict
    Preview {
        /// Conflict id
        id: ConflictId,
    },

    /// Resolve a conflict (keep_local, keep_server, merge)
    Resolve {
        /// Conflict id
        id: ConflictId,

        /// Resolution to apply
        resolution: Resolution,
    },

    /// Delete a conflict without resolving it
    Delete {
        /// Conflict id
        id: ConflictId,
    },

    /// Delete resolved conflicts
    ClearResolved {
        /// Only those resolved more than this many seconds ago
        #[arg(long)]
        older_than: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    let options = CliOptions {
        config: cli.config,
        server: cli.server,
        token: cli.token,
    };
    let ctx = CliContext::open(&data_dir, options).await?;

    match cli.command {
        Commands::Enqueue {
            action_type,
            method,
            url,
            id,
            body,
            headers,
        } => {
            enqueue::run(
                &ctx,
                enqueue::EnqueueArgs {
                    action_type,
                    method,
                    url,
                    resource_id: id,
                    body,
                    headers,
                },
            )
            .await?;
        }
        Commands::List { verbose } => {
            queue::list(&ctx, verbose).await?;
        }
        Commands::Sync { skip_check } => {
            let result = sync::run(&ctx, skip_check).await?;
            if result.failed > 0 {
                anyhow::bail!("{} action(s) failed to replay", result.failed);
            }
        }
        Commands::Force { id } => {
            queue::force(&ctx, id).await?;
        }
        Commands::Discard { id } => {
            queue::discard(&ctx, id).await?;
        }
        Commands::Conflicts(command) => match command {
            ConflictCommands::List { all } => conflicts::list(&ctx, all).await?,
            ConflictCommands::Show { id } => conflicts::show(&ctx, id).await?,
            ConflictCommands::Preview { id } => conflicts::preview(&ctx, id).await?,
            ConflictCommands::Resolve { id, resolution } => {
                conflicts::resolve(&ctx, id, resolution).await?
            }
            ConflictCommands::Delete { id } => conflicts::delete(&ctx, id).await?,
            ConflictCommands::ClearResolved { older_than } => {
                conflicts::clear_resolved(&ctx, older_than).await?
            }
        },
        Commands::Status => {
            status::run(&ctx).await?;
        }
    }

    Ok(())
}

/// Get the default data directory for carelog.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("org", "carelog", "carelog")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
