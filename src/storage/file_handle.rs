//! The single open file owned by an engine instance.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{
    AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt, BufReader,
};

use super::{OpenMode, RecordFormat, Result, StorageError};

/// An open file and the logical filename it was opened under.
///
/// Engines hold this as `Option<OpenFile>`, so the stream and the filename
/// are always present or absent together.
pub struct OpenFile {
    filename: String,
    path: PathBuf,
    stream: BufReader<File>,
}

impl OpenFile {
    /// Acquire the underlying stream for `path`.
    pub(crate) async fn open(filename: &str, path: PathBuf, mode: OpenMode) -> Result<Self> {
        let file = match mode.open_options().open(&path).await {
            Ok(file) => file,
            Err(source) => return Err(StorageError::OpenFailed { path, source }),
        };

        Ok(Self {
            filename: filename.to_string(),
            path,
            stream: BufReader::new(file),
        })
    }

    /// The logical filename, relative to the engine's base path.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The full local path of the open file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::io(&self.path, source)
    }

    /// Read up to `length` bytes. Returns an empty buffer at end of file.
    pub async fn read(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(length.min(64 * 1024));
        let result = (&mut self.stream)
            .take(length as u64)
            .read_to_end(&mut buffer)
            .await;
        result.map_err(|e| self.io_error(e))?;
        Ok(buffer)
    }

    /// Read the next line, including its terminator.
    ///
    /// With `max_length`, at most `max_length - 1` bytes are returned. Returns
    /// `None` at end of file.
    pub async fn read_line(&mut self, max_length: Option<usize>) -> Result<Option<Vec<u8>>> {
        let limit = max_length.map(|n| n.saturating_sub(1));
        if limit == Some(0) {
            return Ok(Some(Vec::new()));
        }

        let mut line = Vec::new();
        loop {
            if limit.is_some_and(|limit| line.len() >= limit) {
                break;
            }

            let available = match self.stream.fill_buf().await {
                Ok(available) => available,
                Err(e) => return Err(StorageError::io(&self.path, e)),
            };
            if available.is_empty() {
                break;
            }

            let room = match limit {
                Some(limit) => (limit - line.len()).min(available.len()),
                None => available.len(),
            };
            let window = &available[..room];

            match window.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    line.extend_from_slice(&window[..=pos]);
                    self.stream.consume(pos + 1);
                    return Ok(Some(line));
                }
                None => {
                    line.extend_from_slice(window);
                    self.stream.consume(room);
                }
            }
        }

        if line.is_empty() {
            Ok(None)
        } else {
            Ok(Some(line))
        }
    }

    /// Read one delimited record, continuing across lines while a quoted
    /// field is open. Returns `None` at end of file.
    pub async fn read_record(&mut self, format: &RecordFormat) -> Result<Option<Vec<String>>> {
        let Some(mut raw) = self.read_line(None).await? else {
            return Ok(None);
        };

        while format.is_incomplete(&raw) {
            match self.read_line(None).await? {
                Some(more) => raw.extend_from_slice(&more),
                None => break,
            }
        }

        Ok(Some(format.parse(&raw)))
    }

    /// Whether the read position is at end of file.
    pub async fn eof(&mut self) -> Result<bool> {
        match self.stream.fill_buf().await {
            Ok(available) => Ok(available.is_empty()),
            Err(e) => Err(StorageError::io(&self.path, e)),
        }
    }

    /// Current position within the file.
    pub async fn tell(&mut self) -> Result<u64> {
        let result = self.stream.stream_position().await;
        result.map_err(|e| self.io_error(e))
    }

    /// Move back to the start of the file.
    pub async fn rewind(&mut self) -> Result<()> {
        let result = self.stream.seek(SeekFrom::Start(0)).await;
        result.map_err(|e| self.io_error(e))?;
        Ok(())
    }

    /// Write all of `data`, returning the number of bytes written.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize> {
        // Drop read-ahead so the write lands at the logical position.
        if !self.stream.buffer().is_empty() {
            let result = self.stream.seek(SeekFrom::Current(0)).await;
            result.map_err(|e| self.io_error(e))?;
        }

        let filename = self.filename.clone();
        let path = self.path.clone();
        write_fully(self.stream.get_mut(), data, &filename, &path).await
    }

    /// Flush pending writes and release the stream.
    pub(crate) async fn close(self) -> Result<()> {
        let mut file = self.stream.into_inner();
        file.flush()
            .await
            .map_err(|e| StorageError::io(&self.path, e))?;
        Ok(())
    }
}

/// Issue writes against the unwritten tail until `data` is fully written.
///
/// A write that makes no progress fails with `ShortWrite` instead of spinning.
pub(crate) async fn write_fully<W>(
    writer: &mut W,
    data: &[u8],
    filename: &str,
    path: &Path,
) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while written < data.len() {
        let n = writer
            .write(&data[written..])
            .await
            .map_err(|e| StorageError::io(path, e))?;
        if n == 0 {
            return Err(StorageError::ShortWrite {
                filename: filename.to_string(),
                written,
                expected: data.len(),
            });
        }
        written += n;
    }
    Ok(written)
}
