//! Configuration and local state for the carelog CLI.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sync_client::{
    ClientConfig, ConflictStore, HttpTransport, PendingActionQueue, StaticToken, SyncOrchestrator,
};
use sync_store::SqliteStore;

/// Name of the config file looked up in the data directory.
pub const CONFIG_FILE: &str = "carelog.toml";

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    /// Explicit config file; must exist when given.
    pub config: Option<PathBuf>,
    /// Overrides `server.base_url`.
    pub server: Option<String>,
    /// Bearer token attached to newly queued actions.
    pub token: Option<String>,
}

/// Opened queue and conflict store plus the effective configuration.
pub struct CliContext {
    /// Directory holding the database and config file.
    pub data_dir: PathBuf,
    /// Effective configuration.
    pub config: Arc<ClientConfig>,
    /// Database file in use.
    pub database: PathBuf,
    /// Pending action queue.
    pub queue: PendingActionQueue,
    /// Conflict store.
    pub conflicts: ConflictStore,
}

impl CliContext {
    /// Load configuration and open the local database.
    pub async fn open(data_dir: &Path, options: CliOptions) -> Result<Self> {
        let mut config = load_config(data_dir, options.config.as_deref())?;
        if let Some(server) = options.server {
            config.server.base_url = Some(server);
        }

        let database = if config.store.database.is_absolute() {
            config.store.database.clone()
        } else {
            data_dir.join(&config.store.database)
        };
        let store = Arc::new(
            SqliteStore::open(&database)
                .await
                .with_context(|| format!("Failed to open database {}", database.display()))?,
        );

        let mut queue = PendingActionQueue::new(store.clone());
        if let Some(token) = options.token {
            queue = queue.with_credentials(Arc::new(StaticToken::new(token)));
        }

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            config: Arc::new(config),
            database,
            queue,
            conflicts: ConflictStore::new(store),
        })
    }

    /// Build an orchestrator talking to the configured server.
    pub fn orchestrator(&self) -> Result<SyncOrchestrator<HttpTransport>> {
        let transport =
            HttpTransport::new(self.config.transport()).context("Failed to build HTTP client")?;
        Ok(
            SyncOrchestrator::new(self.queue.clone(), self.conflicts.clone(), transport)
                .with_strategy_table(self.config.strategy_table())
                .with_preferences(self.config.clone()),
        )
    }
}

/// Load the config file, falling back to defaults when none exists.
pub fn load_config(data_dir: &Path, explicit: Option<&Path>) -> Result<ClientConfig> {
    if let Some(path) = explicit {
        return ClientConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    let path = data_dir.join(CONFIG_FILE);
    if path.exists() {
        ClientConfig::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))
    } else {
        Ok(ClientConfig::default())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::tempdir;

    pub(crate) async fn context(dir: &Path) -> CliContext {
        CliContext::open(dir, CliOptions::default()).await.unwrap()
    }

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config(dir.path(), None).unwrap();
        assert!(config.auto_resolution.enabled);
        assert!(config.server.base_url.is_none());
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(dir.path(), Some(&missing)).is_err());
    }

    #[tokio::test]
    async fn config_file_in_data_dir_is_used() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[store]\ndatabase = \"queue.db\"\n\n[server]\nbase_url = \"https://example.test\"\n",
        )
        .unwrap();

        let ctx = context(dir.path()).await;
        assert_eq!(ctx.database, dir.path().join("queue.db"));
        assert_eq!(
            ctx.config.server.base_url.as_deref(),
            Some("https://example.test")
        );
        assert!(ctx.database.exists());
    }

    #[tokio::test]
    async fn server_flag_overrides_config() {
        let dir = tempdir().unwrap();
        let options = CliOptions {
            server: Some("https://override.test".into()),
            ..CliOptions::default()
        };
        let ctx = CliContext::open(dir.path(), options).await.unwrap();
        assert_eq!(
            ctx.config.server.base_url.as_deref(),
            Some("https://override.test")
        );
        assert!(ctx.orchestrator().is_ok());
    }
}
