//! Configuration types for stowage.
//!
//! This module defines the structures used to represent application configuration
//! as parsed from an INI-format config file.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::storage::StorageOptions;

// =============================================================================
// S3 Settings (shared across s3 and storage.NAME)
// =============================================================================

/// S3-specific connection settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct S3Settings {
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

// =============================================================================
// Config Sections
// =============================================================================

/// [cache] section - root of the cache tier used by remote engines.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub path: PathBuf,
}

/// [s3] section - defaults for every S3-backed engine.
#[derive(Debug, Clone, Default)]
pub struct S3Config {
    pub settings: S3Settings,
}

/// [storage.{name}] section - a named engine.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub url: String,
    /// Engine options; unset keys fall back to the [storage] section.
    pub options: StorageOptions,
    /// S3 settings; unset keys fall back to the [s3] section.
    pub settings: S3Settings,
}

// =============================================================================
// Top-Level Config
// =============================================================================

/// Complete application configuration as parsed from config file.
#[derive(Debug, Clone)]
pub struct Config {
    pub cache: CacheConfig,
    pub s3: S3Config,
    /// [storage] section - option defaults for every engine.
    pub storage: StorageOptions,
    pub storages: HashMap<String, StorageConfig>,
}
