//! Configuration helper for interpreting config values.
//!
//! The `ConfigHelper` wraps a `Config` and resolves the layered values a
//! storage engine needs: named engines fall back to the [storage] and [s3]
//! sections for anything they leave unset.

use std::path::PathBuf;

use super::{Config, S3Settings, StorageConfig};
use crate::object_store::{Credentials, S3ObjectStoreConfig};
use crate::storage::StorageOptions;

/// S3 settings after inheritance has been applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedS3Settings {
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
    pub credentials: Option<Credentials>,
}

impl ResolvedS3Settings {
    /// Fill unset values from `other`.
    pub fn or(self, other: ResolvedS3Settings) -> Self {
        Self {
            endpoint_url: self.endpoint_url.or(other.endpoint_url),
            region: self.region.or(other.region),
            credentials: self.credentials.or(other.credentials),
        }
    }

    pub fn to_object_store_config(&self) -> S3ObjectStoreConfig {
        let mut config = S3ObjectStoreConfig::new();
        if let Some(ref endpoint_url) = self.endpoint_url {
            config = config.with_endpoint_url(endpoint_url);
        }
        if let Some(ref region) = self.region {
            config = config.with_region(region);
        }
        if let Some(ref credentials) = self.credentials {
            config = config.with_credentials(credentials.clone());
        }
        config
    }
}

impl From<&S3Settings> for ResolvedS3Settings {
    /// Credentials are only taken when both halves are present.
    fn from(settings: &S3Settings) -> Self {
        let credentials = match (&settings.access_key_id, &settings.secret_access_key) {
            (Some(id), Some(secret)) => Some(Credentials::new(id, secret)),
            _ => None,
        };
        Self {
            endpoint_url: settings.endpoint_url.clone(),
            region: settings.region.clone(),
            credentials,
        }
    }
}

/// Helper for interpreting configuration values.
#[derive(Debug, Clone)]
pub struct ConfigHelper {
    config: Config,
}

impl ConfigHelper {
    /// Create a new ConfigHelper wrapping the given config.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Get a reference to the underlying config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Root of the cache tier for remote engines.
    pub fn cache_path(&self) -> &PathBuf {
        &self.config.cache.path
    }

    /// Look up a named engine.
    pub fn get_storage(&self, name: &str) -> Option<&StorageConfig> {
        self.config.storages.get(name)
    }

    /// Engine options for specs that don't name an engine.
    pub fn storage_defaults(&self) -> StorageOptions {
        self.config.storage.clone()
    }

    /// Options for a named engine, falling back to [storage].
    pub fn resolve_storage_options(&self, storage: &StorageConfig) -> StorageOptions {
        storage.options.clone().merged_over(self.storage_defaults())
    }

    /// The [s3] section settings.
    pub fn resolve_s3_settings(&self) -> ResolvedS3Settings {
        ResolvedS3Settings::from(&self.config.s3.settings)
    }

    /// S3 settings for a named engine, falling back to [s3].
    pub fn resolve_storage_s3_settings(&self, storage: &StorageConfig) -> ResolvedS3Settings {
        ResolvedS3Settings::from(&storage.settings).or(self.resolve_s3_settings())
    }
}

impl From<Config> for ConfigHelper {
    fn from(config: Config) -> Self {
        Self::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, S3Config};
    use std::collections::HashMap;

    fn helper() -> ConfigHelper {
        let mut storages = HashMap::new();
        storages.insert(
            "media".to_string(),
            StorageConfig {
                url: "s3://media-bucket/assets".to_string(),
                options: StorageOptions::new().with_directory_mode(0o750),
                settings: S3Settings {
                    region: Some("eu-west-1".to_string()),
                    ..S3Settings::default()
                },
            },
        );

        ConfigHelper::new(Config {
            cache: CacheConfig {
                path: PathBuf::from("/var/cache/stowage"),
            },
            s3: S3Config {
                settings: S3Settings {
                    endpoint_url: Some("http://localhost:9000".to_string()),
                    region: Some("us-east-1".to_string()),
                    access_key_id: Some("AKID".to_string()),
                    secret_access_key: Some("SECRET".to_string()),
                },
            },
            storage: StorageOptions::new()
                .with_directory_mode(0o700)
                .with_create_missing_directories(false),
            storages,
        })
    }

    #[test]
    fn test_named_storage_inherits_defaults() {
        let helper = helper();
        let storage = helper.get_storage("media").unwrap();

        let options = helper.resolve_storage_options(storage);
        assert_eq!(options.directory_mode, Some(0o750));
        assert_eq!(options.create_missing_directories, Some(false));

        let settings = helper.resolve_storage_s3_settings(storage);
        assert_eq!(settings.region.as_deref(), Some("eu-west-1"));
        assert_eq!(settings.endpoint_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(settings.credentials, Some(Credentials::new("AKID", "SECRET")));
    }

    #[test]
    fn test_credentials_need_both_halves() {
        let settings = S3Settings {
            access_key_id: Some("AKID".to_string()),
            ..S3Settings::default()
        };
        assert_eq!(ResolvedS3Settings::from(&settings).credentials, None);
    }

    #[test]
    fn test_to_object_store_config() {
        let config = helper().resolve_s3_settings().to_object_store_config();
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.region.as_deref(), Some("us-east-1"));
        assert!(config.credentials.is_some());
    }
}
