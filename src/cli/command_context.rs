//! Command context for CLI commands.
//!
//! Loads the configuration once and resolves which storage a command runs
//! against.

use thiserror::Error;
use tracing::{debug, warn};

use crate::cli::GlobalArgs;
use crate::config::{ConfigError, ConfigHelper, read_config};
use crate::storage::{
    CreateStorageError, RemoteStorage, StorageEngine, create_remote_storage, create_storage,
};

/// Storage used when `--storage` is not given.
pub const DEFAULT_STORAGE_NAME: &str = "default";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during command context creation.
#[derive(Debug, Error)]
pub enum CommandContextError {
    /// No storage was specified and no default storage is configured.
    #[error("storage is required: pass --storage or configure [storage.default]")]
    StorageRequired,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage creation error.
    #[error("{0}")]
    CreateStorage(#[from] CreateStorageError),
}

/// Result type for command context operations.
pub type Result<T> = std::result::Result<T, CommandContextError>;

// =============================================================================
// CommandContext
// =============================================================================

/// Resolved context shared by every command.
pub struct CommandContext {
    config: ConfigHelper,
    storage_spec: Option<String>,
    json: bool,
}

impl CommandContext {
    /// Read the configuration named by the global arguments.
    pub fn new(global: &GlobalArgs) -> Result<Self> {
        let result = read_config(&global.to_config_source())?;
        for warning in &result.warnings {
            warn!("{}", warning);
        }

        Ok(Self::from_config(
            ConfigHelper::new(result.config),
            global.storage.clone(),
            global.json,
        ))
    }

    pub fn from_config(config: ConfigHelper, storage_spec: Option<String>, json: bool) -> Self {
        Self {
            config,
            storage_spec,
            json,
        }
    }

    pub fn config(&self) -> &ConfigHelper {
        &self.config
    }

    /// Whether output should be JSON.
    pub fn json(&self) -> bool {
        self.json
    }

    /// The storage spec to use: `--storage`, else the configured default.
    pub fn storage_spec(&self) -> Result<&str> {
        match self.storage_spec.as_deref() {
            Some(spec) => Ok(spec),
            None if self.config.get_storage(DEFAULT_STORAGE_NAME).is_some() => {
                Ok(DEFAULT_STORAGE_NAME)
            }
            None => Err(CommandContextError::StorageRequired),
        }
    }

    /// Create the engine the command runs against.
    pub async fn open_storage(&self) -> Result<Box<dyn StorageEngine>> {
        let spec = self.storage_spec()?;
        debug!(spec, "opening storage");
        Ok(create_storage(spec, &self.config).await?)
    }

    /// Create the engine as a remote engine, failing for local specs.
    pub async fn open_remote_storage(&self) -> Result<RemoteStorage> {
        let spec = self.storage_spec()?;
        debug!(spec, "opening remote storage");
        Ok(create_remote_storage(spec, &self.config).await?)
    }
}
