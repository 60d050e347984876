//! Storage engines and the capability contract they share.
//!
//! A [`StorageEngine`] offers fopen-style file operations against some
//! backend. Two engines are provided:
//! - [`LocalStorage`] - files under a local base path
//! - [`RemoteStorage`] - objects in an object store, accessed through a local
//!   cache tier managed by a [`LocalStorage`]
//!
//! Each engine instance owns at most one open file at a time. Opening a second
//! file before closing the first fails with `AlreadyOpen`.

mod create_storage;
mod error;
mod file_handle;
mod local_storage;
mod open_mode;
mod options;
mod record_format;
mod remote_storage;

pub use create_storage::{
    CreateStorageError, ParsedStorageSpec, StorageType, create_remote_storage, create_storage,
    create_storage_with_client, remote_storage_with_client,
};
pub use error::{Result, StorageError};
pub use local_storage::LocalStorage;
pub use open_mode::{OpenKind, OpenMode};
pub use options::{StorageOptions, default_cache_root};
pub use record_format::RecordFormat;
pub use remote_storage::RemoteStorage;

use async_trait::async_trait;

/// The operations every storage engine exposes.
///
/// Filenames are logical: relative to the engine's base path (or key
/// prefix), using `/` as the separator. The open file is owned by the engine;
/// `open` establishes it and the handle operations act on it until `close`.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Whether `name` exists in the backend.
    async fn exists(&self, name: &str) -> bool;

    /// Whether `name` is a directory.
    async fn is_directory(&self, name: &str) -> bool;

    /// Whether `name` can be written.
    async fn is_writable(&self, name: &str) -> bool;

    /// Open `name` with `mode`.
    ///
    /// Fails with `AlreadyOpen` if a file is already open, `NotFound` when
    /// opening a missing file for reading, and `NotWritable` or
    /// `DirectoryMissing` when a write-type open cannot proceed.
    async fn open(&mut self, name: &str, mode: OpenMode, use_search_path: bool) -> Result<()>;

    /// The logical filename of the open file, if any.
    fn open_filename(&self) -> Option<&str>;

    /// Read up to `length` bytes.
    async fn read(&mut self, length: usize) -> Result<Vec<u8>>;

    /// Read the next line. Returns `None` at end of file.
    async fn read_line(&mut self, max_length: Option<usize>) -> Result<Option<Vec<u8>>>;

    /// Read the next delimited record. Returns `None` at end of file.
    async fn read_record(&mut self, format: &RecordFormat) -> Result<Option<Vec<String>>>;

    async fn eof(&mut self) -> Result<bool>;

    async fn tell(&mut self) -> Result<u64>;

    async fn rewind(&mut self) -> Result<()>;

    /// Write all of `data` to the open file.
    ///
    /// Fails with `NoOpenHandle` if nothing is open, and `ShortWrite` if the
    /// underlying file stops accepting bytes.
    async fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Close the open file. Does nothing if no file is open.
    async fn close(&mut self) -> Result<()>;

    /// Create a directory, using the configured mode when `mode` is `None`.
    async fn make_directory(&self, path: &str, mode: Option<u32>, recursive: bool) -> Result<()>;

    /// Rename `old_name` to `new_name`. Fails with `NotFound` if the source is absent.
    async fn rename(&mut self, old_name: &str, new_name: &str) -> Result<()>;

    /// Delete `name`. Fails with `NotFound` if it does not exist.
    async fn delete(&mut self, name: &str) -> Result<()>;
}
