//! Configuration module.

mod config_helper;
mod read_config;
mod types;

pub use config_helper::{ConfigHelper, ResolvedS3Settings};
pub use read_config::{ConfigError, ConfigResult, ConfigSource, read_config};
pub use types::{CacheConfig, Config, S3Config, S3Settings, StorageConfig};
