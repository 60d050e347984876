//! Local filesystem storage engine.
//!
//! LocalStorage keeps every file under a configured base path. It is used
//! directly, and as the cache tier of [`RemoteStorage`](super::RemoteStorage).

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::file_handle::OpenFile;
use super::{OpenMode, RecordFormat, Result, StorageEngine, StorageError, StorageOptions};

/// A storage engine backed by a local directory.
pub struct LocalStorage {
    base_path: PathBuf,
    options: StorageOptions,
    handle: Option<OpenFile>,
}

impl LocalStorage {
    /// Create a new LocalStorage from the given options.
    ///
    /// `base_path` is required and must not name an existing file.
    pub fn new(options: StorageOptions) -> Result<Self> {
        let options = options.merged_over(StorageOptions::local_defaults());
        let base_path = options.base_path()?.to_path_buf();

        if base_path.is_file() {
            return Err(StorageError::InvalidOption {
                key: "base_path".to_string(),
                message: format!("{} is a file, not a directory", base_path.display()),
            });
        }

        Ok(Self {
            base_path,
            options,
            handle: None,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn options(&self) -> &StorageOptions {
        &self.options
    }

    /// Resolve a logical filename against the base path.
    pub fn full_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.base_path.join(name))
    }

    fn handle_mut(&mut self) -> Result<&mut OpenFile> {
        self.handle.as_mut().ok_or(StorageError::NoOpenHandle)
    }

    pub(crate) fn ensure_closed(&self) -> Result<()> {
        match &self.handle {
            Some(handle) => Err(StorageError::AlreadyOpen {
                filename: handle.filename().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Create a missing directory if permitted, otherwise fail.
    pub(crate) async fn handle_missing_directory(&self, dir: &str) -> Result<()> {
        if self.options.create_missing_directories()? {
            debug!(dir, "creating missing directory");
            self.make_directory(dir, None, true).await
        } else {
            Err(StorageError::DirectoryMissing {
                path: self.full_path(dir)?,
            })
        }
    }

    /// Look for `name` in the configured search path directories.
    async fn find_in_search_paths(&self, name: &str) -> Option<PathBuf> {
        for dir in self.options.search_paths() {
            let candidate = dir.join(name);
            if path_exists(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }

    /// Validate that `name` can be opened with `mode`, returning the path to open.
    async fn pre_open(&self, name: &str, mode: OpenMode, use_search_path: bool) -> Result<PathBuf> {
        self.ensure_closed()?;

        let path = self.full_path(name)?;
        let dir = parent_name(name);

        if mode.is_write_type() {
            if path_exists(&path).await && !path_is_writable(&path).await {
                return Err(StorageError::NotWritable { path });
            } else if !self.is_directory(dir).await {
                self.handle_missing_directory(dir).await?;
            }
        } else if !path_exists(&path).await {
            if use_search_path && let Some(found) = self.find_in_search_paths(name).await {
                return Ok(found);
            }
            return Err(StorageError::not_found(path.display()));
        }

        Ok(path)
    }

    /// Close the open stream, returning the filename it was opened under.
    ///
    /// The handle is cleared even if flushing fails.
    pub(crate) async fn release(&mut self) -> Result<Option<String>> {
        let Some(handle) = self.handle.take() else {
            return Ok(None);
        };
        let filename = handle.filename().to_string();
        handle.close().await?;
        debug!(%filename, "closed");
        Ok(Some(filename))
    }
}

#[async_trait]
impl StorageEngine for LocalStorage {
    async fn exists(&self, name: &str) -> bool {
        match self.full_path(name) {
            Ok(path) => path_exists(&path).await,
            Err(_) => false,
        }
    }

    async fn is_directory(&self, name: &str) -> bool {
        match self.full_path(name) {
            Ok(path) => fs::metadata(&path).await.is_ok_and(|m| m.is_dir()),
            Err(_) => false,
        }
    }

    async fn is_writable(&self, name: &str) -> bool {
        match self.full_path(name) {
            Ok(path) => path_is_writable(&path).await,
            Err(_) => false,
        }
    }

    async fn open(&mut self, name: &str, mode: OpenMode, use_search_path: bool) -> Result<()> {
        let path = self.pre_open(name, mode, use_search_path).await?;
        debug!(name, %mode, path = %path.display(), "opening");
        self.handle = Some(OpenFile::open(name, path, mode).await?);
        Ok(())
    }

    fn open_filename(&self) -> Option<&str> {
        self.handle.as_ref().map(|handle| handle.filename())
    }

    async fn read(&mut self, length: usize) -> Result<Vec<u8>> {
        self.handle_mut()?.read(length).await
    }

    async fn read_line(&mut self, max_length: Option<usize>) -> Result<Option<Vec<u8>>> {
        self.handle_mut()?.read_line(max_length).await
    }

    async fn read_record(&mut self, format: &RecordFormat) -> Result<Option<Vec<String>>> {
        self.handle_mut()?.read_record(format).await
    }

    async fn eof(&mut self) -> Result<bool> {
        self.handle_mut()?.eof().await
    }

    async fn tell(&mut self) -> Result<u64> {
        self.handle_mut()?.tell().await
    }

    async fn rewind(&mut self) -> Result<()> {
        self.handle_mut()?.rewind().await
    }

    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.handle_mut()?.write(data).await
    }

    async fn close(&mut self) -> Result<()> {
        self.release().await?;
        Ok(())
    }

    async fn make_directory(&self, path: &str, mode: Option<u32>, recursive: bool) -> Result<()> {
        let full_path = self.full_path(path)?;
        let mode = match mode {
            Some(mode) => mode,
            None => self.options.directory_mode()?,
        };

        let mut builder = fs::DirBuilder::new();
        builder.recursive(recursive);
        #[cfg(unix)]
        builder.mode(mode);
        #[cfg(not(unix))]
        let _ = mode;

        builder
            .create(&full_path)
            .await
            .map_err(|e| StorageError::io(&full_path, e))
    }

    async fn rename(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        let old_path = self.full_path(old_name)?;
        let new_path = self.full_path(new_name)?;

        let dir = parent_name(new_name);
        if !self.is_directory(dir).await {
            self.handle_missing_directory(dir).await?;
        }

        fs::rename(&old_path, &new_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::not_found(old_path.display())
            } else {
                StorageError::io(&old_path, e)
            }
        })
    }

    async fn delete(&mut self, name: &str) -> Result<()> {
        let path = self.full_path(name)?;
        if !path_exists(&path).await {
            return Err(StorageError::not_found(path.display()));
        }
        fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::io(&path, e))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Reject absolute filenames and any that would escape the base path.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let valid = Path::new(name)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidPath(name.to_string()))
    }
}

/// The canonical form of a logical filename: its components joined with `/`.
///
/// `.` and empty segments are dropped, so `./a//b.txt` becomes `a/b.txt`.
pub(crate) fn normalize_name(name: &str) -> Result<String> {
    validate_name(name)?;
    let parts: Vec<&str> = Path::new(name)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        return Err(StorageError::InvalidPath(name.to_string()));
    }
    Ok(parts.join("/"))
}

/// The directory part of a logical filename; empty for top-level files.
pub(crate) fn parent_name(name: &str) -> &str {
    Path::new(name)
        .parent()
        .and_then(|p| p.to_str())
        .unwrap_or("")
}

async fn path_exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

async fn path_is_writable(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .is_ok_and(|m| !m.permissions().readonly())
}

// =============================================================================
// Tests
// =============================================================================
