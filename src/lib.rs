//! stowage - fopen-style file access over local directories and S3-backed
//! storage with a local cache tier.

pub mod cli;
pub mod config;
pub mod object_store;
pub mod storage;

pub use object_store::{
    AccessPolicy, MemoryObjectStore, ObjectLocation, ObjectStoreClient, RemoteFailure,
    S3ObjectStore, StorageClass,
};
pub use storage::{
    LocalStorage, OpenMode, RecordFormat, RemoteStorage, Result, StorageEngine, StorageError,
    StorageOptions, create_storage,
};
