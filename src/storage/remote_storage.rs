//! Cache-backed remote storage engine.
//!
//! RemoteStorage stores files as objects in an object store and does all
//! byte-level I/O against a local cache tier ([`LocalStorage`]):
//!
//! - Before opening, the cache is synchronized: a cached copy is trusted;
//!   otherwise a remote object is downloaded into the cache, and a read-type
//!   open of a name missing remotely fails with `NotFound`.
//! - After a clean close the cached copy is uploaded, then evicted. If the
//!   upload fails the cached copy stays, so it can be retried with
//!   [`RemoteStorage::retry_upload`].
//! - Existence, rename and delete talk to the object store directly. Object
//!   stores have no directories, so every directory is reported present.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};

use super::local_storage::{normalize_name, parent_name};
use super::{
    LocalStorage, OpenKind, OpenMode, RecordFormat, Result, StorageEngine, StorageError,
    StorageOptions,
};
use crate::object_store::{ObjectLocation, ObjectStoreClient, PutOptions};

/// A storage engine backed by an object store, with a local cache tier.
pub struct RemoteStorage {
    local: LocalStorage,
    client: Arc<dyn ObjectStoreClient>,
    bucket: String,
    prefix: String,
    put_options: PutOptions,
}

impl RemoteStorage {
    /// Create a new RemoteStorage using `client` to reach the object store.
    ///
    /// `bucket` is required. Objects are keyed under `remote_base_path`; the
    /// cache tier lives at `base_path`, which defaults to a temp directory
    /// mirroring the remote prefix.
    pub fn new(options: StorageOptions, client: Arc<dyn ObjectStoreClient>) -> Result<Self> {
        let prefix = options
            .remote_base_path()
            .unwrap_or("")
            .trim_matches('/')
            .to_string();
        let options = options.merged_over(StorageOptions::remote_defaults(&prefix));

        let bucket = options.bucket()?.to_string();
        let put_options = PutOptions {
            access_policy: options.access_policy()?,
            storage_class: options.storage_class()?,
        };

        Ok(Self {
            local: LocalStorage::new(options)?,
            client,
            bucket,
            prefix,
            put_options,
        })
    }

    /// The cache tier.
    pub fn cache(&self) -> &LocalStorage {
        &self.local
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The remote location of a logical filename.
    ///
    /// The key is built from the normalized name, the same one the cache uses.
    pub fn location(&self, name: &str) -> Result<ObjectLocation> {
        let name = normalize_name(name)?;
        let key = if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.prefix, name)
        };
        Ok(ObjectLocation::new(&self.bucket, key))
    }

    /// Ask the object store whether `location` exists.
    ///
    /// Anything other than a definite answer (an access-denied response for
    /// a missing key, say) counts as absent.
    async fn exists_remotely(&self, location: &ObjectLocation) -> bool {
        match self.client.object_exists(location).await {
            Ok(exists) => exists,
            Err(failure) => {
                warn!(%location, %failure, "existence check failed; treating as absent");
                false
            }
        }
    }

    /// Bring the cache in line with the object store before opening `name`.
    ///
    /// `name` must already be normalized.
    async fn synchronize(&mut self, name: &str, mode: OpenMode) -> Result<()> {
        if self.local.exists(name).await {
            debug!(name, "using cached copy");
            return Ok(());
        }

        let location = self.location(name)?;
        let dest = self.local.full_path(name)?;

        if !self.exists_remotely(&location).await {
            if mode.is_read_type() {
                return Err(StorageError::not_found(&location));
            }
            debug!(%location, "not present remotely; nothing to fetch");
            return Ok(());
        }

        if mode.kind() == OpenKind::Exclusive {
            return Err(StorageError::OpenFailed {
                path: dest,
                source: std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!("{} already exists", location),
                ),
            });
        }
        if mode.truncates() {
            debug!(%location, "skipping download; open truncates");
            return Ok(());
        }

        let dir = parent_name(name);
        if !self.local.is_directory(dir).await {
            self.local.handle_missing_directory(dir).await?;
        }

        debug!(%location, dest = %dest.display(), "downloading into cache");
        if let Err(failure) = self.client.get_object(&location, &dest).await {
            match fs::remove_file(&dest).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    path = %dest.display(),
                    error = %e,
                    "failed to remove partial download"
                ),
            }
            return Err(StorageError::DownloadFailed { location, failure });
        }

        Ok(())
    }

    /// Upload the cached copy of `name`, then evict it from the cache.
    async fn write_back(&mut self, name: &str) -> Result<()> {
        let location = self.location(name)?;
        let path = self.local.full_path(name)?;

        info!(%location, "uploading cached copy");
        if let Err(failure) = self
            .client
            .put_object(&location, &path, self.put_options)
            .await
        {
            warn!(
                %location,
                %failure,
                path = %path.display(),
                "upload failed; keeping cached copy"
            );
            return Err(StorageError::UploadFailed { location, failure });
        }

        // The remote copy is authoritative now.
        if let Err(e) = self.local.delete(name).await {
            warn!(%location, error = %e, "failed to evict cached copy");
        }

        Ok(())
    }

    /// Upload a cached copy left behind by a failed write-back.
    ///
    /// Fails with `NotFound` if there is no cached copy and `AlreadyOpen` if
    /// `name` is currently open.
    pub async fn retry_upload(&mut self, name: &str) -> Result<()> {
        let name = normalize_name(name)?;
        if let Some(open) = self.local.open_filename()
            && open == name
        {
            return Err(StorageError::AlreadyOpen {
                filename: open.to_string(),
            });
        }

        let path = self.local.full_path(&name)?;
        if !self.local.exists(&name).await {
            return Err(StorageError::not_found(path.display()));
        }

        self.write_back(&name).await
    }
}

#[async_trait]
impl StorageEngine for RemoteStorage {
    /// Checked against the object store, never the cache.
    async fn exists(&self, name: &str) -> bool {
        match self.location(name) {
            Ok(location) => self.exists_remotely(&location).await,
            Err(_) => false,
        }
    }

    /// Object stores have no directories; every prefix counts as one.
    async fn is_directory(&self, _name: &str) -> bool {
        true
    }

    /// Writability is only known by attempting the write.
    async fn is_writable(&self, _name: &str) -> bool {
        true
    }

    /// Opens go through the cache tier; the search path is not consulted.
    async fn open(&mut self, name: &str, mode: OpenMode, _use_search_path: bool) -> Result<()> {
        let name = normalize_name(name)?;
        self.local.ensure_closed()?;
        self.synchronize(&name, mode).await?;
        self.local.open(&name, mode, false).await
    }

    fn open_filename(&self) -> Option<&str> {
        self.local.open_filename()
    }

    async fn read(&mut self, length: usize) -> Result<Vec<u8>> {
        self.local.read(length).await
    }

    async fn read_line(&mut self, max_length: Option<usize>) -> Result<Option<Vec<u8>>> {
        self.local.read_line(max_length).await
    }

    async fn read_record(&mut self, format: &RecordFormat) -> Result<Option<Vec<String>>> {
        self.local.read_record(format).await
    }

    async fn eof(&mut self) -> Result<bool> {
        self.local.eof().await
    }

    async fn tell(&mut self) -> Result<u64> {
        self.local.tell().await
    }

    async fn rewind(&mut self) -> Result<()> {
        self.local.rewind().await
    }

    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.local.write(data).await
    }

    async fn close(&mut self) -> Result<()> {
        match self.local.release().await? {
            Some(filename) => self.write_back(&filename).await,
            None => Ok(()),
        }
    }

    /// Creates the directory in the cache tier only.
    async fn make_directory(&self, path: &str, mode: Option<u32>, recursive: bool) -> Result<()> {
        self.local.make_directory(path, mode, recursive).await
    }

    /// Copy to the new key, then delete the old one.
    ///
    /// Not atomic: if the delete fails, the object exists under both keys.
    async fn rename(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        let from = self.location(old_name)?;
        let to = self.location(new_name)?;

        if !self.exists_remotely(&from).await {
            return Err(StorageError::not_found(&from));
        }
        if from == to {
            return Ok(());
        }

        info!(%from, %to, "renaming");
        if let Err(failure) = self.client.copy_object(&from, &to).await {
            return Err(StorageError::CopyFailed { from, to, failure });
        }

        self.delete(old_name).await
    }

    async fn delete(&mut self, name: &str) -> Result<()> {
        let location = self.location(name)?;

        if !self.exists_remotely(&location).await {
            return Err(StorageError::not_found(&location));
        }

        info!(%location, "deleting");
        self.client
            .delete_object(&location)
            .await
            .map_err(|failure| StorageError::DeleteFailed {
                location: location.clone(),
                failure,
            })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::{
        AccessPolicy, MemoryObjectStore, MemoryOperation, RemoteFailure, StorageClass,
    };
    use tempfile::TempDir;

    const BUCKET: &str = "test-bucket";

    struct Fixture {
        _cache: TempDir,
        store: Arc<MemoryObjectStore>,
        storage: RemoteStorage,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_options(StorageOptions::new())
        }

        fn with_options(options: StorageOptions) -> Self {
            let cache = TempDir::new().unwrap();
            let store = Arc::new(MemoryObjectStore::new());
            let storage = RemoteStorage::new(
                options
                    .with_base_path(cache.path())
                    .with_bucket(BUCKET)
                    .with_remote_base_path("uploads"),
                store.clone(),
            )
            .unwrap();
            Self {
                _cache: cache,
                store,
                storage,
            }
        }

        fn location(&self, name: &str) -> ObjectLocation {
            ObjectLocation::new(BUCKET, format!("uploads/{}", name))
        }

        async fn write(&mut self, name: &str, data: &[u8]) {
            self.storage.open(name, OpenMode::WRITE, false).await.unwrap();
            self.storage.write(data).await.unwrap();
            self.storage.close().await.unwrap();
        }

        async fn read(&mut self, name: &str) -> Vec<u8> {
            self.storage.open(name, OpenMode::READ, false).await.unwrap();
            let data = self.storage.read(usize::MAX).await.unwrap();
            self.storage.close().await.unwrap();
            data
        }

        async fn cached(&self, name: &str) -> bool {
            self.storage.cache().exists(name).await
        }
    }

    #[test]
    fn test_bucket_is_required() {
        let cache = TempDir::new().unwrap();
        let result = RemoteStorage::new(
            StorageOptions::new().with_base_path(cache.path()),
            Arc::new(MemoryObjectStore::new()),
        );
        assert!(matches!(result, Err(StorageError::UnknownOption(key)) if key == "bucket"));
    }

    #[test]
    fn test_location_uses_prefix() {
        let fixture = Fixture::new();
        let location = fixture.storage.location("a/b.txt").unwrap();
        assert_eq!(location.key, "uploads/a/b.txt");

        let cache = TempDir::new().unwrap();
        let unprefixed = RemoteStorage::new(
            StorageOptions::new()
                .with_base_path(cache.path())
                .with_bucket(BUCKET),
            Arc::new(MemoryObjectStore::new()),
        )
        .unwrap();
        assert_eq!(unprefixed.location("a.txt").unwrap().key, "a.txt");
        assert!(matches!(
            unprefixed.location("../a.txt"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_read_missing_everywhere_is_not_found() {
        let mut fixture = Fixture::new();

        let result = fixture
            .storage
            .open("missing.txt", OpenMode::READ, false)
            .await;
        match result {
            Err(StorageError::NotFound { location }) => {
                assert_eq!(location, "s3://test-bucket/uploads/missing.txt");
            }
            other => panic!("expected NotFound, got {:?}", other.err()),
        }
        assert_eq!(fixture.storage.open_filename(), None);
        assert_eq!(fixture.store.calls(MemoryOperation::Get), 0);
    }

    #[tokio::test]
    async fn test_read_downloads_once_into_cache() {
        let mut fixture = Fixture::new();
        let content = b"remote content \x00\xff bytes".to_vec();
        fixture
            .store
            .insert(&fixture.location("docs/report.txt"), content.clone());

        fixture
            .storage
            .open("docs/report.txt", OpenMode::READ, false)
            .await
            .unwrap();
        assert_eq!(fixture.store.calls(MemoryOperation::Get), 1);
        assert!(fixture.cached("docs/report.txt").await);
        assert_eq!(fixture.storage.read(usize::MAX).await.unwrap(), content);

        fixture.storage.rewind().await.unwrap();
        assert_eq!(fixture.storage.read(6).await.unwrap(), b"remote");
        assert_eq!(fixture.store.calls(MemoryOperation::Get), 1);
    }

    #[tokio::test]
    async fn test_cached_copy_is_trusted() {
        let mut fixture = Fixture::new();
        fixture.store.insert(&fixture.location("a.txt"), "remote");
        tokio::fs::write(fixture.storage.cache().full_path("a.txt").unwrap(), "cached")
            .await
            .unwrap();

        fixture
            .storage
            .open("a.txt", OpenMode::READ, false)
            .await
            .unwrap();
        assert_eq!(fixture.storage.read(64).await.unwrap(), b"cached");
        assert_eq!(fixture.store.calls(MemoryOperation::Exists), 0);
        assert_eq!(fixture.store.calls(MemoryOperation::Get), 0);
    }

    #[tokio::test]
    async fn test_write_close_uploads_and_evicts() {
        let mut fixture = Fixture::with_options(
            StorageOptions::new()
                .with_access_policy(AccessPolicy::Private)
                .with_storage_class(StorageClass::ReducedRedundancy),
        );

        fixture.write("new/file.bin", b"payload").await;

        assert!(!fixture.cached("new/file.bin").await);
        assert!(fixture.storage.exists("new/file.bin").await);
        let location = fixture.location("new/file.bin");
        assert_eq!(fixture.store.object(&location), Some(b"payload".to_vec()));
        assert_eq!(
            fixture.store.put_options(&location),
            Some(PutOptions {
                access_policy: AccessPolicy::Private,
                storage_class: StorageClass::ReducedRedundancy,
            })
        );

        assert_eq!(fixture.read("new/file.bin").await, b"payload");
        assert!(!fixture.cached("new/file.bin").await);
    }

    #[tokio::test]
    async fn test_default_upload_settings() {
        let mut fixture = Fixture::new();
        fixture.write("a.txt", b"x").await;

        assert_eq!(
            fixture.store.put_options(&fixture.location("a.txt")),
            Some(PutOptions {
                access_policy: AccessPolicy::PublicRead,
                storage_class: StorageClass::Standard,
            })
        );
    }

    #[tokio::test]
    async fn test_append_extends_remote_object() {
        let mut fixture = Fixture::new();
        fixture.store.insert(&fixture.location("log.txt"), "one\n");

        fixture
            .storage
            .open("log.txt", OpenMode::APPEND, false)
            .await
            .unwrap();
        fixture.storage.write(b"two\n").await.unwrap();
        fixture.storage.close().await.unwrap();

        assert_eq!(
            fixture.store.object(&fixture.location("log.txt")),
            Some(b"one\ntwo\n".to_vec())
        );
    }

    #[tokio::test]
    async fn test_truncating_open_skips_download() {
        let mut fixture = Fixture::new();
        fixture.store.insert(&fixture.location("a.txt"), "old");

        fixture.write("a.txt", b"new").await;

        assert_eq!(fixture.store.calls(MemoryOperation::Get), 0);
        assert_eq!(
            fixture.store.object(&fixture.location("a.txt")),
            Some(b"new".to_vec())
        );
    }

    #[tokio::test]
    async fn test_exclusive_open_of_remote_object() {
        let mut fixture = Fixture::new();
        fixture.store.insert(&fixture.location("a.txt"), "old");

        let result = fixture
            .storage
            .open("a.txt", "x".parse().unwrap(), false)
            .await;
        assert!(matches!(result, Err(StorageError::OpenFailed { .. })));
    }

    #[tokio::test]
    async fn test_second_open_fails_and_first_stays_usable() {
        let mut fixture = Fixture::new();
        fixture.store.insert(&fixture.location("b.txt"), "b");

        fixture
            .storage
            .open("a.txt", OpenMode::WRITE, false)
            .await
            .unwrap();
        let result = fixture.storage.open("b.txt", OpenMode::READ, false).await;
        assert!(matches!(result, Err(StorageError::AlreadyOpen { .. })));
        assert_eq!(fixture.store.calls(MemoryOperation::Get), 0);

        fixture.storage.write(b"first").await.unwrap();
        fixture.storage.close().await.unwrap();
        assert_eq!(
            fixture.store.object(&fixture.location("a.txt")),
            Some(b"first".to_vec())
        );
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_cache_and_closes_handle() {
        let mut fixture = Fixture::new();
        fixture.store.fail(
            MemoryOperation::Put,
            RemoteFailure::new("SlowDown", "Please reduce your request rate."),
        );

        fixture
            .storage
            .open("a.txt", OpenMode::WRITE, false)
            .await
            .unwrap();
        fixture.storage.write(b"precious").await.unwrap();
        let result = fixture.storage.close().await;

        match result {
            Err(StorageError::UploadFailed { location, failure }) => {
                assert_eq!(location, fixture.location("a.txt"));
                assert_eq!(failure.code, "SlowDown");
            }
            other => panic!("expected UploadFailed, got {:?}", other),
        }
        assert_eq!(fixture.storage.open_filename(), None);
        assert!(fixture.cached("a.txt").await);
        assert_eq!(fixture.store.object(&fixture.location("a.txt")), None);

        // The cached copy survives for a retry.
        fixture.store.clear_failure(MemoryOperation::Put);
        fixture.storage.retry_upload("a.txt").await.unwrap();
        assert!(!fixture.cached("a.txt").await);
        assert_eq!(
            fixture.store.object(&fixture.location("a.txt")),
            Some(b"precious".to_vec())
        );
    }

    #[tokio::test]
    async fn test_retry_upload_without_cached_copy() {
        let mut fixture = Fixture::new();

        let result = fixture.storage.retry_upload("a.txt").await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
        assert_eq!(fixture.store.calls(MemoryOperation::Put), 0);
    }

    #[tokio::test]
    async fn test_retry_upload_of_open_file() {
        let mut fixture = Fixture::new();
        fixture
            .storage
            .open("a.txt", OpenMode::WRITE, false)
            .await
            .unwrap();

        let result = fixture.storage.retry_upload("a.txt").await;
        assert!(matches!(result, Err(StorageError::AlreadyOpen { .. })));
    }

    #[tokio::test]
    async fn test_download_failure() {
        let mut fixture = Fixture::new();
        fixture.store.insert(&fixture.location("a/b.txt"), "data");
        fixture.store.fail(
            MemoryOperation::Get,
            RemoteFailure::new("InternalError", "We encountered an internal error."),
        );

        let result = fixture.storage.open("a/b.txt", OpenMode::READ, false).await;
        assert!(matches!(result, Err(StorageError::DownloadFailed { .. })));
        assert!(!fixture.cached("a/b.txt").await);
        assert_eq!(fixture.storage.open_filename(), None);
    }

    #[tokio::test]
    async fn test_download_needs_cache_directory() {
        let mut fixture =
            Fixture::with_options(StorageOptions::new().with_create_missing_directories(false));
        fixture.store.insert(&fixture.location("deep/b.txt"), "data");

        let result = fixture
            .storage
            .open("deep/b.txt", OpenMode::READ, false)
            .await;
        assert!(matches!(result, Err(StorageError::DirectoryMissing { .. })));
        assert_eq!(fixture.store.calls(MemoryOperation::Get), 0);
    }

    #[tokio::test]
    async fn test_ambiguous_existence_is_false() {
        let fixture = Fixture::new();
        fixture.store.insert(&fixture.location("a.txt"), "data");
        fixture.store.fail(
            MemoryOperation::Exists,
            RemoteFailure::new("Http403", "Forbidden"),
        );

        assert!(!fixture.storage.exists("a.txt").await);
    }

    #[tokio::test]
    async fn test_exists_ignores_cache() {
        let fixture = Fixture::new();
        tokio::fs::write(fixture.storage.cache().full_path("a.txt").unwrap(), "cached")
            .await
            .unwrap();

        assert!(!fixture.storage.exists("a.txt").await);
    }

    #[tokio::test]
    async fn test_directories_and_writability() {
        let fixture = Fixture::new();

        assert!(fixture.storage.is_directory("anything/at/all").await);
        assert!(fixture.storage.is_writable("not/there.txt").await);
    }

    #[tokio::test]
    async fn test_make_directory_only_touches_cache() {
        let fixture = Fixture::new();

        fixture
            .storage
            .make_directory("reports/2026", None, true)
            .await
            .unwrap();

        assert!(
            fixture
                .storage
                .cache()
                .base_path()
                .join("reports/2026")
                .is_dir()
        );
        for operation in [
            MemoryOperation::Exists,
            MemoryOperation::Put,
            MemoryOperation::Get,
            MemoryOperation::Copy,
            MemoryOperation::Delete,
        ] {
            assert_eq!(fixture.store.calls(operation), 0);
        }
        assert!(fixture.storage.is_directory("reports/2026").await);
    }

    #[tokio::test]
    async fn test_rename() {
        let mut fixture = Fixture::new();
        fixture.write("a.txt", b"content").await;

        fixture.storage.rename("a.txt", "dir/b.txt").await.unwrap();

        assert!(fixture.storage.exists("dir/b.txt").await);
        assert!(!fixture.storage.exists("a.txt").await);
        assert_eq!(fixture.read("dir/b.txt").await, b"content");
    }

    #[tokio::test]
    async fn test_rename_missing_source() {
        let mut fixture = Fixture::new();

        let result = fixture.storage.rename("a.txt", "b.txt").await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
        assert_eq!(fixture.store.calls(MemoryOperation::Copy), 0);
    }

    #[tokio::test]
    async fn test_rename_onto_itself_keeps_object() {
        let mut fixture = Fixture::new();
        fixture.store.insert(&fixture.location("a.txt"), "data");

        fixture.storage.rename("a.txt", "./a.txt").await.unwrap();

        assert!(fixture.storage.exists("a.txt").await);
        assert_eq!(
            fixture.store.object(&fixture.location("a.txt")).unwrap(),
            b"data"
        );
        assert_eq!(fixture.store.calls(MemoryOperation::Copy), 0);
        assert_eq!(fixture.store.calls(MemoryOperation::Delete), 0);
    }

    #[tokio::test]
    async fn test_dot_segments_name_one_object() {
        let mut fixture = Fixture::new();
        fixture.write("./a.txt", b"hi").await;
        fixture.write("dir//b.txt", b"there").await;

        assert_eq!(fixture.store.object(&fixture.location("a.txt")).unwrap(), b"hi");
        assert_eq!(
            fixture.store.object(&fixture.location("dir/b.txt")).unwrap(),
            b"there"
        );
        assert!(fixture.storage.exists("a.txt").await);
        assert!(fixture.storage.exists("./a.txt").await);
        assert_eq!(fixture.read("a.txt").await, b"hi");
        assert_eq!(fixture.read("dir/./b.txt").await, b"there");
        assert!(matches!(
            fixture.storage.open(".", OpenMode::WRITE, false).await,
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_rename_copy_failure_leaves_source() {
        let mut fixture = Fixture::new();
        fixture.store.insert(&fixture.location("a.txt"), "data");
        fixture.store.fail(
            MemoryOperation::Copy,
            RemoteFailure::new("AccessDenied", "Access Denied"),
        );

        let result = fixture.storage.rename("a.txt", "b.txt").await;
        assert!(matches!(result, Err(StorageError::CopyFailed { .. })));
        assert!(fixture.storage.exists("a.txt").await);
        assert!(!fixture.storage.exists("b.txt").await);
    }

    #[tokio::test]
    async fn test_rename_delete_failure_leaves_both() {
        let mut fixture = Fixture::new();
        fixture.store.insert(&fixture.location("a.txt"), "data");
        fixture.store.fail(
            MemoryOperation::Delete,
            RemoteFailure::new("AccessDenied", "Access Denied"),
        );

        let result = fixture.storage.rename("a.txt", "b.txt").await;
        assert!(matches!(result, Err(StorageError::DeleteFailed { .. })));
        assert!(fixture.storage.exists("a.txt").await);
        assert!(fixture.storage.exists("b.txt").await);
    }

    #[tokio::test]
    async fn test_delete() {
        let mut fixture = Fixture::new();

        let result = fixture.storage.delete("a.txt").await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
        assert_eq!(fixture.store.calls(MemoryOperation::Delete), 0);

        fixture.write("a.txt", b"x").await;
        fixture.storage.delete("a.txt").await.unwrap();
        assert!(!fixture.storage.exists("a.txt").await);
    }

    #[tokio::test]
    async fn test_delete_failure() {
        let mut fixture = Fixture::new();
        fixture.store.insert(&fixture.location("a.txt"), "data");
        fixture.store.fail(
            MemoryOperation::Delete,
            RemoteFailure::new("AccessDenied", "Access Denied"),
        );

        match fixture.storage.delete("a.txt").await {
            Err(StorageError::DeleteFailed { failure, .. }) => {
                assert_eq!(failure.code, "AccessDenied");
            }
            other => panic!("expected DeleteFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_records_from_remote_object() {
        let mut fixture = Fixture::new();
        fixture
            .store
            .insert(&fixture.location("data.csv"), "name,qty\n\"widget, large\",3\n");

        fixture
            .storage
            .open("data.csv", OpenMode::READ, false)
            .await
            .unwrap();
        let format = RecordFormat::default();
        assert_eq!(
            fixture.storage.read_record(&format).await.unwrap(),
            Some(vec!["name".to_string(), "qty".to_string()])
        );
        assert_eq!(
            fixture.storage.read_record(&format).await.unwrap(),
            Some(vec!["widget, large".to_string(), "3".to_string()])
        );
        assert_eq!(fixture.storage.read_record(&format).await.unwrap(), None);
        fixture.storage.close().await.unwrap();
    }
}
