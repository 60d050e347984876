//! S3-based ObjectStoreClient implementation.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ObjectCannedAcl, StorageClass as S3StorageClass};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tokio::fs;

use super::{
    AccessPolicy, ObjectLocation, ObjectStoreClient, PutOptions, RemoteFailure, RemoteResult,
    StorageClass,
};

/// Characters left unencoded in a `CopySource` key.
const COPY_SOURCE_KEEP: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

// =============================================================================
// Configuration
// =============================================================================

/// Static access key credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

/// Configuration for S3ObjectStore.
#[derive(Debug, Clone, Default)]
pub struct S3ObjectStoreConfig {
    /// Optional custom endpoint URL (for LocalStack, MinIO, etc.).
    pub endpoint_url: Option<String>,
    /// Optional region override.
    pub region: Option<String>,
    /// Static credentials. When absent the standard AWS credential chain is used.
    pub credentials: Option<Credentials>,
}

impl S3ObjectStoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom endpoint URL (for LocalStack, MinIO, etc.).
    pub fn with_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    /// Set a region override.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Use static credentials instead of the default credential chain.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

// =============================================================================
// S3ObjectStore
// =============================================================================

/// An object store client backed by S3 (or any S3-compatible service).
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Create a new client with the given configuration.
    pub async fn new(config: S3ObjectStoreConfig) -> Self {
        let mut aws_config_loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(ref region) = config.region {
            aws_config_loader =
                aws_config_loader.region(aws_sdk_s3::config::Region::new(region.clone()));
        }

        if let Some(credentials) = config.credentials {
            aws_config_loader =
                aws_config_loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                    credentials.access_key_id,
                    credentials.secret_access_key,
                    None,
                    None,
                    "stowage",
                ));
        }

        let aws_config = aws_config_loader.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);

        if let Some(ref endpoint) = config.endpoint_url {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true);
        }

        Self {
            client: Client::from_conf(s3_config_builder.build()),
        }
    }
}

fn is_not_found<E>(err: &SdkError<E>) -> bool {
    matches!(err, SdkError::ServiceError(e) if e.raw().status().as_u16() == 404)
}

/// Convert an SDK error into the code/message pair surfaced to callers.
fn remote_failure<E>(err: SdkError<E>) -> RemoteFailure
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let code = match err.code() {
        Some(code) => code.to_string(),
        None => match &err {
            SdkError::ServiceError(e) => format!("Http{}", e.raw().status().as_u16()),
            SdkError::TimeoutError(_) => "Timeout".to_string(),
            SdkError::DispatchFailure(_) => "DispatchFailure".to_string(),
            _ => "Unknown".to_string(),
        },
    };
    let message = match err.message() {
        Some(message) => message.to_string(),
        None => DisplayErrorContext(&err).to_string(),
    };
    RemoteFailure { code, message }
}

fn copy_source(location: &ObjectLocation) -> String {
    format!(
        "{}/{}",
        location.bucket,
        utf8_percent_encode(&location.key, COPY_SOURCE_KEEP)
    )
}

fn canned_acl(policy: AccessPolicy) -> ObjectCannedAcl {
    match policy {
        AccessPolicy::Private => ObjectCannedAcl::Private,
        AccessPolicy::PublicRead => ObjectCannedAcl::PublicRead,
        AccessPolicy::PublicReadWrite => ObjectCannedAcl::PublicReadWrite,
        AccessPolicy::AuthenticatedRead => ObjectCannedAcl::AuthenticatedRead,
        AccessPolicy::BucketOwnerRead => ObjectCannedAcl::BucketOwnerRead,
        AccessPolicy::BucketOwnerFullControl => ObjectCannedAcl::BucketOwnerFullControl,
    }
}

fn s3_storage_class(class: StorageClass) -> S3StorageClass {
    match class {
        StorageClass::Standard => S3StorageClass::Standard,
        StorageClass::ReducedRedundancy => S3StorageClass::ReducedRedundancy,
        StorageClass::StandardIa => S3StorageClass::StandardIa,
        StorageClass::IntelligentTiering => S3StorageClass::IntelligentTiering,
    }
}

#[async_trait]
impl ObjectStoreClient for S3ObjectStore {
    async fn object_exists(&self, location: &ObjectLocation) -> RemoteResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(remote_failure(err)),
        }
    }

    async fn put_object(
        &self,
        location: &ObjectLocation,
        local_path: &Path,
        options: PutOptions,
    ) -> RemoteResult<()> {
        let body = ByteStream::from_path(local_path).await.map_err(|e| {
            RemoteFailure::new("LocalIo", format!("{}: {}", local_path.display(), e))
        })?;

        self.client
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .acl(canned_acl(options.access_policy))
            .storage_class(s3_storage_class(options.storage_class))
            .body(body)
            .send()
            .await
            .map_err(remote_failure)?;

        Ok(())
    }

    async fn get_object(&self, location: &ObjectLocation, dest_path: &Path) -> RemoteResult<()> {
        let response = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(remote_failure)?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| RemoteFailure::new("BodyRead", e.to_string()))?;

        fs::write(dest_path, bytes.into_bytes())
            .await
            .map_err(|e| RemoteFailure::new("LocalIo", format!("{}: {}", dest_path.display(), e)))
    }

    async fn copy_object(&self, src: &ObjectLocation, dst: &ObjectLocation) -> RemoteResult<()> {
        self.client
            .copy_object()
            .copy_source(copy_source(src))
            .bucket(&dst.bucket)
            .key(&dst.key)
            .send()
            .await
            .map_err(remote_failure)?;

        Ok(())
    }

    async fn delete_object(&self, location: &ObjectLocation) -> RemoteResult<()> {
        self.client
            .delete_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(remote_failure)?;

        Ok(())
    }
}
