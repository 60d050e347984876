//! Object store clients used by the cache-backed remote engine.
//!
//! An [`ObjectStoreClient`] exposes the five primitives the remote engine
//! needs: existence check, upload, download, copy and delete. Transport
//! details stay inside the client; callers only ever see success or a
//! [`RemoteFailure`] carrying the backend's own code and message.

mod memory_object_store;
mod s3_object_store;

pub use memory_object_store::{MemoryObjectStore, MemoryOperation};
pub use s3_object_store::{Credentials, S3ObjectStore, S3ObjectStoreConfig};

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type for object store operations.
pub type RemoteResult<T> = std::result::Result<T, RemoteFailure>;

/// A non-success response from the object store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("({code}) {message}")]
pub struct RemoteFailure {
    /// Backend error code, e.g. `NoSuchKey` or `AccessDenied`.
    pub code: String,
    /// Human-readable message from the backend.
    pub message: String,
}

impl RemoteFailure {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// A bucket and key pair naming one remote object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

// =============================================================================
// Upload Settings
// =============================================================================

/// Canned access policy applied to uploaded objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessPolicy {
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl AccessPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessPolicy::Private => "private",
            AccessPolicy::PublicRead => "public-read",
            AccessPolicy::PublicReadWrite => "public-read-write",
            AccessPolicy::AuthenticatedRead => "authenticated-read",
            AccessPolicy::BucketOwnerRead => "bucket-owner-read",
            AccessPolicy::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

impl FromStr for AccessPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "private" => Ok(AccessPolicy::Private),
            "public" | "public-read" => Ok(AccessPolicy::PublicRead),
            "open" | "public-read-write" => Ok(AccessPolicy::PublicReadWrite),
            "authenticated-read" | "auth-read" => Ok(AccessPolicy::AuthenticatedRead),
            "bucket-owner-read" | "owner-read" => Ok(AccessPolicy::BucketOwnerRead),
            "bucket-owner-full-control" | "owner-full-control" => {
                Ok(AccessPolicy::BucketOwnerFullControl)
            }
            other => Err(format!("unknown access policy '{}'", other)),
        }
    }
}

impl fmt::Display for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage tier for uploaded objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageClass {
    Standard,
    ReducedRedundancy,
    StandardIa,
    IntelligentTiering,
}

impl StorageClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageClass::Standard => "standard",
            StorageClass::ReducedRedundancy => "reduced-redundancy",
            StorageClass::StandardIa => "standard-ia",
            StorageClass::IntelligentTiering => "intelligent-tiering",
        }
    }
}

impl FromStr for StorageClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "standard" => Ok(StorageClass::Standard),
            "reduced" | "reduced-redundancy" => Ok(StorageClass::ReducedRedundancy),
            "standard-ia" => Ok(StorageClass::StandardIa),
            "intelligent-tiering" => Ok(StorageClass::IntelligentTiering),
            other => Err(format!("unknown storage class '{}'", other)),
        }
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings attached to every upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOptions {
    pub access_policy: AccessPolicy,
    pub storage_class: StorageClass,
}

// =============================================================================
// ObjectStoreClient Trait
// =============================================================================

/// The remote capability consumed by the cache-backed engine.
///
/// All operations complete before returning. Implementations never retry.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// Check whether an object exists.
    ///
    /// Returns `Ok(false)` only for a definite "not found". Any other
    /// non-success (for example access denied) is returned as an error so the
    /// caller can decide how to treat the ambiguity.
    async fn object_exists(&self, location: &ObjectLocation) -> RemoteResult<bool>;

    /// Upload the file at `local_path` to `location`.
    async fn put_object(
        &self,
        location: &ObjectLocation,
        local_path: &Path,
        options: PutOptions,
    ) -> RemoteResult<()>;

    /// Download `location` into the file at `dest_path`, replacing it.
    async fn get_object(&self, location: &ObjectLocation, dest_path: &Path) -> RemoteResult<()>;

    /// Server-side copy from `src` to `dst`.
    async fn copy_object(&self, src: &ObjectLocation, dst: &ObjectLocation) -> RemoteResult<()>;

    /// Delete the object at `location`.
    async fn delete_object(&self, location: &ObjectLocation) -> RemoteResult<()>;
}
