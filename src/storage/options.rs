//! Resolved engine options.

use std::path::{Path, PathBuf};

use crate::object_store::{AccessPolicy, Credentials, StorageClass};

use super::{Result, StorageError};

const DEFAULT_CREATE_MISSING_DIRECTORIES: bool = true;
const DEFAULT_DIRECTORY_MODE: u32 = 0o777;
const DEFAULT_ACCESS_POLICY: AccessPolicy = AccessPolicy::PublicRead;
const DEFAULT_STORAGE_CLASS: StorageClass = StorageClass::Standard;
const DEFAULT_CACHE_DIRNAME: &str = "stowage-cache";

/// Options for a storage engine.
///
/// Every field is optional while options are being assembled. Engines merge
/// the caller's options over their defaults once, at construction, with
/// [`StorageOptions::merged_over`]. Reading an option that was neither
/// supplied nor defaulted fails with `UnknownOption`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageOptions {
    /// Directory holding the files of a local engine, or the cache tier of a
    /// remote engine.
    pub base_path: Option<PathBuf>,
    /// Key prefix under which a remote engine stores objects.
    pub remote_base_path: Option<String>,
    /// Create missing parent directories when writing.
    pub create_missing_directories: Option<bool>,
    /// Permission bits for created directories.
    pub directory_mode: Option<u32>,
    pub access_policy: Option<AccessPolicy>,
    pub storage_class: Option<StorageClass>,
    pub credentials: Option<Credentials>,
    pub bucket: Option<String>,
    /// Extra directories consulted by opens that ask for the search path.
    pub search_paths: Option<Vec<PathBuf>>,
}

impl StorageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults shared by every engine.
    pub fn local_defaults() -> Self {
        Self {
            create_missing_directories: Some(DEFAULT_CREATE_MISSING_DIRECTORIES),
            directory_mode: Some(DEFAULT_DIRECTORY_MODE),
            ..Self::default()
        }
    }

    /// Defaults for a remote engine whose keys live under `remote_base_path`.
    ///
    /// The cache tier defaults to a directory under the system temp dir that
    /// mirrors the remote prefix.
    pub fn remote_defaults(remote_base_path: &str) -> Self {
        Self {
            base_path: Some(default_cache_root().join(remote_base_path)),
            remote_base_path: Some(remote_base_path.to_string()),
            access_policy: Some(DEFAULT_ACCESS_POLICY),
            storage_class: Some(DEFAULT_STORAGE_CLASS),
            ..Self::local_defaults()
        }
    }

    /// Fill every option missing from `self` with the one from `defaults`.
    pub fn merged_over(self, defaults: StorageOptions) -> Self {
        Self {
            base_path: self.base_path.or(defaults.base_path),
            remote_base_path: self.remote_base_path.or(defaults.remote_base_path),
            create_missing_directories: self
                .create_missing_directories
                .or(defaults.create_missing_directories),
            directory_mode: self.directory_mode.or(defaults.directory_mode),
            access_policy: self.access_policy.or(defaults.access_policy),
            storage_class: self.storage_class.or(defaults.storage_class),
            credentials: self.credentials.or(defaults.credentials),
            bucket: self.bucket.or(defaults.bucket),
            search_paths: self.search_paths.or(defaults.search_paths),
        }
    }

    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn with_remote_base_path(mut self, prefix: impl Into<String>) -> Self {
        self.remote_base_path = Some(prefix.into());
        self
    }

    pub fn with_create_missing_directories(mut self, create: bool) -> Self {
        self.create_missing_directories = Some(create);
        self
    }

    pub fn with_directory_mode(mut self, mode: u32) -> Self {
        self.directory_mode = Some(mode);
        self
    }

    pub fn with_access_policy(mut self, policy: AccessPolicy) -> Self {
        self.access_policy = Some(policy);
        self
    }

    pub fn with_storage_class(mut self, class: StorageClass) -> Self {
        self.storage_class = Some(class);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = Some(paths);
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn base_path(&self) -> Result<&Path> {
        self.base_path.as_deref().ok_or_else(|| unknown("base_path"))
    }

    pub fn remote_base_path(&self) -> Result<&str> {
        self.remote_base_path
            .as_deref()
            .ok_or_else(|| unknown("remote_base_path"))
    }

    pub fn create_missing_directories(&self) -> Result<bool> {
        self.create_missing_directories
            .ok_or_else(|| unknown("create_missing_directories"))
    }

    pub fn directory_mode(&self) -> Result<u32> {
        self.directory_mode.ok_or_else(|| unknown("directory_mode"))
    }

    pub fn access_policy(&self) -> Result<AccessPolicy> {
        self.access_policy.ok_or_else(|| unknown("access_policy"))
    }

    pub fn storage_class(&self) -> Result<StorageClass> {
        self.storage_class.ok_or_else(|| unknown("storage_class"))
    }

    pub fn credentials(&self) -> Result<&Credentials> {
        self.credentials.as_ref().ok_or_else(|| unknown("credentials"))
    }

    pub fn bucket(&self) -> Result<&str> {
        self.bucket.as_deref().ok_or_else(|| unknown("bucket"))
    }

    /// Search path directories; none unless configured.
    pub fn search_paths(&self) -> &[PathBuf] {
        self.search_paths.as_deref().unwrap_or_default()
    }
}

fn unknown(key: &str) -> StorageError {
    StorageError::UnknownOption(key.to_string())
}

/// Root of the default cache tier for remote engines.
pub fn default_cache_root() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_CACHE_DIRNAME)
}
