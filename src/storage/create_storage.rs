//! Storage engine creation utilities.
//!
//! This module parses storage specifications and builds the engine they
//! describe, resolving named engines and option defaults through the
//! configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::{LocalStorage, RemoteStorage, StorageEngine, StorageError, StorageOptions};
use crate::config::{ConfigHelper, ResolvedS3Settings};
use crate::object_store::{ObjectStoreClient, S3ObjectStore};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during engine creation.
#[derive(Debug, Error)]
pub enum CreateStorageError {
    /// The storage specification is invalid.
    #[error("invalid storage spec: {0}")]
    InvalidSpec(String),

    /// The URL scheme is not supported.
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// A named engine was not found in the configuration.
    #[error("storage not found: {0}")]
    StorageNotFound(String),

    /// The engine rejected its options.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for engine creation.
pub type Result<T> = std::result::Result<T, CreateStorageError>;

// =============================================================================
// Parsed Storage Specification
// =============================================================================

/// The kind of engine indicated by a specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// Local filesystem (file:// URL).
    Local,
    /// S3-compatible object store behind a local cache (s3:// URL).
    S3,
}

/// A parsed storage specification.
#[derive(Debug, Clone)]
pub struct ParsedStorageSpec {
    pub storage_type: StorageType,

    /// For S3: the bucket name. For local: the base path.
    pub location: String,

    /// For S3: optional key prefix within the bucket.
    pub prefix: Option<String>,

    /// Engine options resolved from the configuration.
    pub options: StorageOptions,

    /// Connection settings (S3 only).
    pub s3: ResolvedS3Settings,
}

impl ParsedStorageSpec {
    /// Parse a storage specification string.
    ///
    /// Accepts:
    /// - `s3://bucket/prefix?endpoint_url=...&region=...`
    /// - `file:///path/to/directory`
    /// - A bare name (looked up in config)
    ///
    /// With a config, options fall back to the [storage] section and S3
    /// settings to the [s3] section.
    pub fn parse(spec: &str, config: Option<&ConfigHelper>) -> Result<Self> {
        let mut parsed = if let Some(rest) = spec.strip_prefix("s3://") {
            Self::parse_s3_url(rest)?
        } else if let Some(rest) = spec.strip_prefix("file://") {
            Self::parse_file_url(rest)?
        } else if let Some((scheme, _)) = spec.split_once("://") {
            return Err(CreateStorageError::UnsupportedScheme(scheme.to_string()));
        } else {
            return Self::parse_named(spec, config);
        };

        if let Some(config) = config {
            parsed.options = config.storage_defaults();
            parsed.s3 = parsed.s3.or(config.resolve_s3_settings());
            parsed.default_cache_path(config);
        }

        Ok(parsed)
    }

    fn parse_s3_url(without_scheme: &str) -> Result<Self> {
        // Split on '?' to separate path from query string
        let (path_part, query_part) = match without_scheme.split_once('?') {
            Some((path, query)) => (path, query),
            None => (without_scheme, ""),
        };

        let (bucket, prefix) = match path_part.split_once('/') {
            Some((bucket, prefix)) => {
                let prefix = prefix.trim_matches('/');
                (
                    bucket.to_string(),
                    (!prefix.is_empty()).then(|| prefix.to_string()),
                )
            }
            None => (path_part.to_string(), None),
        };

        if bucket.is_empty() {
            return Err(CreateStorageError::InvalidSpec(
                "S3 URL must include bucket name".to_string(),
            ));
        }

        let params = parse_query_string(query_part);

        Ok(Self {
            storage_type: StorageType::S3,
            location: bucket,
            prefix,
            options: StorageOptions::new(),
            s3: ResolvedS3Settings {
                endpoint_url: params.get("endpoint_url").cloned(),
                region: params.get("region").cloned(),
                credentials: None,
            },
        })
    }

    fn parse_file_url(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(CreateStorageError::InvalidSpec(
                "file:// URL must include a path".to_string(),
            ));
        }

        Ok(Self {
            storage_type: StorageType::Local,
            location: path.to_string(),
            prefix: None,
            options: StorageOptions::new(),
            s3: ResolvedS3Settings::default(),
        })
    }

    fn parse_named(name: &str, config: Option<&ConfigHelper>) -> Result<Self> {
        let config = config.ok_or_else(|| {
            CreateStorageError::InvalidSpec(format!(
                "'{}' looks like a storage name but no config provided",
                name
            ))
        })?;

        let storage_config = config
            .get_storage(name)
            .ok_or_else(|| CreateStorageError::StorageNotFound(name.to_string()))?;

        if storage_config.url.is_empty() {
            return Err(CreateStorageError::InvalidSpec(format!(
                "storage '{}' has no url",
                name
            )));
        }

        let mut parsed = Self::parse(&storage_config.url, None)?;

        // URL query params win over config settings
        parsed.s3 = parsed
            .s3
            .or(config.resolve_storage_s3_settings(storage_config));
        parsed.options = config.resolve_storage_options(storage_config);
        parsed.default_cache_path(config);

        Ok(parsed)
    }

    /// Place an S3 engine's cache tier under the configured cache root,
    /// unless the options already name one.
    fn default_cache_path(&mut self, config: &ConfigHelper) {
        if self.storage_type != StorageType::S3 || self.options.base_path.is_some() {
            return;
        }
        let mut path = config.cache_path().join(&self.location);
        if let Some(ref prefix) = self.prefix {
            path = path.join(prefix);
        }
        self.options.base_path = Some(path);
    }

    /// The options handed to the engine.
    pub fn engine_options(&self) -> StorageOptions {
        let options = self.options.clone();
        match self.storage_type {
            StorageType::Local => options.with_base_path(PathBuf::from(&self.location)),
            StorageType::S3 => {
                let mut options = options
                    .with_bucket(&self.location)
                    .with_remote_base_path(self.prefix.clone().unwrap_or_default());
                if options.credentials.is_none() {
                    options.credentials = self.s3.credentials.clone();
                }
                options
            }
        }
    }
}

/// Parse a query string into key-value pairs.
fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| {
            let value = percent_encoding::percent_decode_str(value)
                .decode_utf8_lossy()
                .into_owned();
            (key.to_string(), value)
        })
        .collect()
}

// =============================================================================
// Engine Creation
// =============================================================================

/// Create an engine from a specification string.
///
/// S3 specs get an [`S3ObjectStore`] built from the resolved S3 settings.
pub async fn create_storage(spec: &str, config: &ConfigHelper) -> Result<Box<dyn StorageEngine>> {
    let parsed = ParsedStorageSpec::parse(spec, Some(config))?;
    debug!(spec, storage_type = ?parsed.storage_type, "creating storage");

    match parsed.storage_type {
        StorageType::Local => Ok(Box::new(LocalStorage::new(parsed.engine_options())?)),
        StorageType::S3 => {
            let client = s3_client(&parsed).await;
            create_storage_with_client(&parsed, client)
        }
    }
}

/// Create a remote engine from a specification string.
///
/// Fails with `UnsupportedScheme` if the spec does not describe a remote engine.
pub async fn create_remote_storage(spec: &str, config: &ConfigHelper) -> Result<RemoteStorage> {
    let parsed = ParsedStorageSpec::parse(spec, Some(config))?;
    if parsed.storage_type != StorageType::S3 {
        return Err(not_remote(&parsed));
    }
    let client = s3_client(&parsed).await;
    remote_storage_with_client(&parsed, client)
}

/// Create an engine from a parsed spec, using `client` for remote engines.
pub fn create_storage_with_client(
    parsed: &ParsedStorageSpec,
    client: Arc<dyn ObjectStoreClient>,
) -> Result<Box<dyn StorageEngine>> {
    match parsed.storage_type {
        StorageType::Local => Ok(Box::new(LocalStorage::new(parsed.engine_options())?)),
        StorageType::S3 => Ok(Box::new(remote_storage_with_client(parsed, client)?)),
    }
}

/// Create a remote engine from a parsed spec.
pub fn remote_storage_with_client(
    parsed: &ParsedStorageSpec,
    client: Arc<dyn ObjectStoreClient>,
) -> Result<RemoteStorage> {
    if parsed.storage_type != StorageType::S3 {
        return Err(not_remote(parsed));
    }
    Ok(RemoteStorage::new(parsed.engine_options(), client)?)
}

fn not_remote(parsed: &ParsedStorageSpec) -> CreateStorageError {
    CreateStorageError::UnsupportedScheme(format!(
        "{} is not a remote storage",
        parsed.location
    ))
}

async fn s3_client(parsed: &ParsedStorageSpec) -> Arc<dyn ObjectStoreClient> {
    let mut settings = parsed.s3.clone();
    if let Ok(credentials) = parsed.options.credentials() {
        settings.credentials = Some(credentials.clone());
    }
    Arc::new(S3ObjectStore::new(settings.to_object_store_config()).await)
}

// =============================================================================
// Tests
// =============================================================================
