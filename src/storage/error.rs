use std::path::PathBuf;

use thiserror::Error;

use crate::object_store::{ObjectLocation, RemoteFailure};

/// Errors that can occur in storage engine operations.
///
/// None of these are retried internally; each ends the operation in progress.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file pointer already open: {filename}")]
    AlreadyOpen { filename: String },

    #[error("no open file pointer")]
    NoOpenHandle,

    #[error("the file {location} does not exist")]
    NotFound { location: String },

    #[error("the file {} is not writable", path.display())]
    NotWritable { path: PathBuf },

    #[error("the directory {} does not exist", path.display())]
    DirectoryMissing { path: PathBuf },

    #[error("cannot open file {}: {source}", path.display())]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("zero bytes written to file {filename} ({written} of {expected} bytes written)")]
    ShortWrite {
        filename: String,
        written: usize,
        expected: usize,
    },

    #[error("unable to upload {location} => {failure}")]
    UploadFailed {
        location: ObjectLocation,
        failure: RemoteFailure,
    },

    #[error("unable to download {location} => {failure}")]
    DownloadFailed {
        location: ObjectLocation,
        failure: RemoteFailure,
    },

    #[error("unable to copy {from} to {to} => {failure}")]
    CopyFailed {
        from: ObjectLocation,
        to: ObjectLocation,
        failure: RemoteFailure,
    },

    #[error("unable to remove {location} => {failure}")]
    DeleteFailed {
        location: ObjectLocation,
        failure: RemoteFailure,
    },

    #[error("no such option: {0}")]
    UnknownOption(String),

    #[error("invalid option '{key}': {message}")]
    InvalidOption { key: String, message: String },

    #[error("invalid path '{0}'")]
    InvalidPath(String),

    #[error("invalid open mode '{0}'")]
    InvalidMode(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn not_found(location: impl ToString) -> Self {
        StorageError::NotFound {
            location: location.to_string(),
        }
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
