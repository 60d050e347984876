use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::fs;

use super::{ObjectLocation, ObjectStoreClient, PutOptions, RemoteFailure, RemoteResult};

/// The operations of [`ObjectStoreClient`], used to inject failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryOperation {
    Exists,
    Put,
    Get,
    Copy,
    Delete,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    options: Option<PutOptions>,
}

#[derive(Default)]
struct State {
    objects: HashMap<ObjectLocation, StoredObject>,
    failures: HashMap<MemoryOperation, RemoteFailure>,
    calls: HashMap<MemoryOperation, usize>,
}

/// An in-memory implementation of `ObjectStoreClient`, intended primarily for testing.
///
/// Failures can be injected per operation with [`MemoryObjectStore::fail`]; an
/// injected failure stays active until [`MemoryObjectStore::clear_failure`].
#[derive(Default)]
pub struct MemoryObjectStore {
    state: Mutex<State>,
}

impl MemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store an object directly, bypassing the client interface.
    pub fn insert(&self, location: &ObjectLocation, data: impl Into<Vec<u8>>) {
        self.state().objects.insert(
            location.clone(),
            StoredObject {
                data: data.into(),
                options: None,
            },
        );
    }

    /// Read an object directly, bypassing the client interface.
    pub fn object(&self, location: &ObjectLocation) -> Option<Vec<u8>> {
        self.state()
            .objects
            .get(location)
            .map(|object| object.data.clone())
    }

    /// The options an object was last uploaded with, if it was uploaded.
    pub fn put_options(&self, location: &ObjectLocation) -> Option<PutOptions> {
        self.state()
            .objects
            .get(location)
            .and_then(|object| object.options)
    }

    /// Make every subsequent call of `operation` fail with `failure`.
    pub fn fail(&self, operation: MemoryOperation, failure: RemoteFailure) {
        self.state().failures.insert(operation, failure);
    }

    /// Stop injecting failures for `operation`.
    pub fn clear_failure(&self, operation: MemoryOperation) {
        self.state().failures.remove(&operation);
    }

    /// Number of times `operation` has been called.
    pub fn calls(&self, operation: MemoryOperation) -> usize {
        self.state().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Record a call and return the injected failure, if any.
    fn begin(&self, operation: MemoryOperation) -> RemoteResult<()> {
        let mut state = self.state();
        *state.calls.entry(operation).or_insert(0) += 1;
        match state.failures.get(&operation) {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

fn no_such_key(location: &ObjectLocation) -> RemoteFailure {
    RemoteFailure::new(
        "NoSuchKey",
        format!("The specified key does not exist: {}", location),
    )
}

fn io_failure(path: &Path, err: std::io::Error) -> RemoteFailure {
    RemoteFailure::new("LocalIo", format!("{}: {}", path.display(), err))
}

#[async_trait]
impl ObjectStoreClient for MemoryObjectStore {
    async fn object_exists(&self, location: &ObjectLocation) -> RemoteResult<bool> {
        self.begin(MemoryOperation::Exists)?;
        Ok(self.state().objects.contains_key(location))
    }

    async fn put_object(
        &self,
        location: &ObjectLocation,
        local_path: &Path,
        options: PutOptions,
    ) -> RemoteResult<()> {
        self.begin(MemoryOperation::Put)?;
        let data = fs::read(local_path)
            .await
            .map_err(|e| io_failure(local_path, e))?;
        self.state().objects.insert(
            location.clone(),
            StoredObject {
                data,
                options: Some(options),
            },
        );
        Ok(())
    }

    async fn get_object(&self, location: &ObjectLocation, dest_path: &Path) -> RemoteResult<()> {
        self.begin(MemoryOperation::Get)?;
        let data = self
            .object(location)
            .ok_or_else(|| no_such_key(location))?;
        fs::write(dest_path, data)
            .await
            .map_err(|e| io_failure(dest_path, e))
    }

    async fn copy_object(&self, src: &ObjectLocation, dst: &ObjectLocation) -> RemoteResult<()> {
        self.begin(MemoryOperation::Copy)?;
        let mut state = self.state();
        let object = state
            .objects
            .get(src)
            .cloned()
            .ok_or_else(|| no_such_key(src))?;
        state.objects.insert(dst.clone(), object);
        Ok(())
    }

    async fn delete_object(&self, location: &ObjectLocation) -> RemoteResult<()> {
        self.begin(MemoryOperation::Delete)?;
        // S3 reports success for deletes of absent keys.
        self.state().objects.remove(location);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::{AccessPolicy, StorageClass};
    use tempfile::TempDir;

    fn options() -> PutOptions {
        PutOptions {
            access_policy: AccessPolicy::Private,
            storage_class: StorageClass::Standard,
        }
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = MemoryObjectStore::new();
        let location = ObjectLocation::new("bucket", "a/b.txt");

        let source = temp.path().join("source");
        fs::write(&source, b"payload").await.unwrap();

        assert!(!store.object_exists(&location).await.unwrap());
        store.put_object(&location, &source, options()).await.unwrap();
        assert!(store.object_exists(&location).await.unwrap());
        assert_eq!(store.put_options(&location), Some(options()));

        let dest = temp.path().join("dest");
        store.get_object(&location, &dest).await.unwrap();
        assert_eq!(fs::read(&dest).await.unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_get_missing_object() {
        let temp = TempDir::new().unwrap();
        let store = MemoryObjectStore::new();
        let location = ObjectLocation::new("bucket", "missing");

        let err = store
            .get_object(&location, &temp.path().join("dest"))
            .await
            .unwrap_err();
        assert_eq!(err.code, "NoSuchKey");
    }

    #[tokio::test]
    async fn test_copy_and_delete() {
        let store = MemoryObjectStore::new();
        let src = ObjectLocation::new("bucket", "src");
        let dst = ObjectLocation::new("bucket", "dst");
        store.insert(&src, "data");

        store.copy_object(&src, &dst).await.unwrap();
        assert_eq!(store.object(&dst), Some(b"data".to_vec()));

        store.delete_object(&src).await.unwrap();
        assert_eq!(store.object(&src), None);
        assert_eq!(store.object(&dst), Some(b"data".to_vec()));
    }

    #[tokio::test]
    async fn test_injected_failure_and_call_counts() {
        let store = MemoryObjectStore::new();
        let location = ObjectLocation::new("bucket", "key");
        store.insert(&location, "data");

        store.fail(
            MemoryOperation::Delete,
            RemoteFailure::new("AccessDenied", "Access Denied"),
        );
        let err = store.delete_object(&location).await.unwrap_err();
        assert_eq!(err.code, "AccessDenied");
        assert!(store.object(&location).is_some());

        store.clear_failure(MemoryOperation::Delete);
        store.delete_object(&location).await.unwrap();
        assert_eq!(store.calls(MemoryOperation::Delete), 2);
        assert_eq!(store.calls(MemoryOperation::Put), 0);
    }
}
