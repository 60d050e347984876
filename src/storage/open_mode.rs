//! fopen-style open modes.

use std::fmt;
use std::str::FromStr;

use tokio::fs::OpenOptions;

use super::StorageError;

/// The base behaviour selected by the first character of a mode string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenKind {
    /// `r`: the file must exist; positioned at the start.
    Read,
    /// `w`: created if missing, truncated if present.
    Truncate,
    /// `a`: created if missing; every write goes to the end.
    Append,
    /// `x`: created exclusively; fails if the file exists.
    Exclusive,
    /// `c`: created if missing, never truncated.
    Create,
}

/// A parsed open mode such as `"r"`, `"w+"` or `"ab"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    kind: OpenKind,
    update: bool,
}

impl OpenMode {
    pub const READ: OpenMode = OpenMode {
        kind: OpenKind::Read,
        update: false,
    };
    pub const WRITE: OpenMode = OpenMode {
        kind: OpenKind::Truncate,
        update: false,
    };
    pub const APPEND: OpenMode = OpenMode {
        kind: OpenKind::Append,
        update: false,
    };

    pub fn kind(&self) -> OpenKind {
        self.kind
    }

    /// Read-type modes require the target to already exist.
    pub fn is_read_type(&self) -> bool {
        self.kind == OpenKind::Read
    }

    /// Write-type modes may create the target and need its directory.
    pub fn is_write_type(&self) -> bool {
        !self.is_read_type()
    }

    /// Whether opening discards any existing content.
    pub fn truncates(&self) -> bool {
        self.kind == OpenKind::Truncate
    }

    pub fn can_read(&self) -> bool {
        self.kind == OpenKind::Read || self.update
    }

    pub fn can_write(&self) -> bool {
        self.kind != OpenKind::Read || self.update
    }

    /// Translate into the options used to acquire the underlying file.
    pub fn open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(self.can_read());
        match self.kind {
            OpenKind::Read => {
                options.write(self.update);
            }
            OpenKind::Truncate => {
                options.write(true).create(true).truncate(true);
            }
            OpenKind::Append => {
                options.append(true).create(true);
            }
            OpenKind::Exclusive => {
                options.write(true).create_new(true);
            }
            OpenKind::Create => {
                options.write(true).create(true);
            }
        }
        options
    }
}

impl FromStr for OpenMode {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StorageError::InvalidMode(s.to_string());

        let mut chars = s.chars();
        let kind = match chars.next() {
            Some('r') => OpenKind::Read,
            Some('w') => OpenKind::Truncate,
            Some('a') => OpenKind::Append,
            Some('x') => OpenKind::Exclusive,
            Some('c') => OpenKind::Create,
            _ => return Err(invalid()),
        };

        let mut update = false;
        let mut binary_flag = false;
        for c in chars {
            match c {
                '+' if !update => update = true,
                'b' | 't' if !binary_flag => binary_flag = true,
                _ => return Err(invalid()),
            }
        }

        Ok(OpenMode { kind, update })
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self.kind {
            OpenKind::Read => 'r',
            OpenKind::Truncate => 'w',
            OpenKind::Append => 'a',
            OpenKind::Exclusive => 'x',
            OpenKind::Create => 'c',
        };
        if self.update {
            write!(f, "{}+", c)
        } else {
            write!(f, "{}", c)
        }
    }
}
