//! Commands that read or write file contents.

use clap::Args;
use serde::Serialize;

use crate::cli::args::parse_ascii_byte;
use crate::cli::{CliError, CommandContext, InputSource, OutputSink, Result};
use crate::storage::{OpenMode, RecordFormat, StorageEngine};

const READ_CHUNK_SIZE: usize = 64 * 1024;

// =============================================================================
// Cat
// =============================================================================

/// Arguments for the cat command.
#[derive(Args, Debug)]
pub struct CatArgs {
    /// File to print.
    pub name: String,

    /// Print only the first N lines.
    #[arg(short = 'n', long)]
    pub lines: Option<usize>,

    /// Fall back to the configured search paths.
    #[arg(long = "search-path")]
    pub search_path: bool,

    #[command(flatten)]
    pub output: OutputSink,
}

impl CatArgs {
    pub async fn run(self, ctx: &CommandContext) -> Result<()> {
        let mut storage = ctx.open_storage().await?;
        let data = self.read(storage.as_mut()).await?;
        self.output.write_bytes(&data).await?;
        Ok(())
    }

    async fn read(&self, storage: &mut dyn StorageEngine) -> Result<Vec<u8>> {
        storage
            .open(&self.name, OpenMode::READ, self.search_path)
            .await?;

        let mut data = Vec::new();
        match self.lines {
            Some(count) => {
                for _ in 0..count {
                    match storage.read_line(None).await? {
                        Some(line) => data.extend_from_slice(&line),
                        None => break,
                    }
                }
            }
            None => loop {
                let chunk = storage.read(READ_CHUNK_SIZE).await?;
                if chunk.is_empty() {
                    break;
                }
                data.extend_from_slice(&chunk);
            },
        }

        storage.close().await?;
        Ok(data)
    }
}

// =============================================================================
// Put
// =============================================================================

/// Arguments for the put command.
#[derive(Args, Debug)]
pub struct PutArgs {
    /// File to write.
    pub name: String,

    /// Content to write. If omitted, reads --input-file or stdin.
    pub value: Option<String>,

    /// Open mode: w (truncate), a (append), x (must not exist), c (create, keep contents).
    #[arg(short, long, default_value = "w")]
    pub mode: OpenMode,

    #[command(flatten)]
    pub input: InputSource,

    #[command(flatten)]
    pub output: OutputSink,
}

#[derive(Debug, Serialize)]
struct PutOutput<'a> {
    name: &'a str,
    bytes: usize,
}

impl PutArgs {
    pub async fn run(self, ctx: &CommandContext) -> Result<()> {
        if !self.mode.can_write() {
            return Err(CliError::Other(format!(
                "mode '{}' does not allow writing",
                self.mode
            )));
        }

        let data = self.input.read_bytes(self.value.as_deref()).await?;

        let mut storage = ctx.open_storage().await?;
        storage.open(&self.name, self.mode, false).await?;
        let written = storage.write(&data).await?;
        storage.close().await?;

        if ctx.json() {
            let output = PutOutput {
                name: &self.name,
                bytes: written,
            };
            self.output.write(&output, true).await?;
        } else {
            self.output
                .write_str(&format!("wrote {} bytes to {}", written, self.name))
                .await?;
        }
        Ok(())
    }
}

// =============================================================================
// Records
// =============================================================================

/// Arguments for the records command.
#[derive(Args, Debug)]
pub struct RecordsArgs {
    /// Delimited file to read.
    pub name: String,

    /// Field delimiter.
    #[arg(short, long, default_value = ",", value_parser = parse_ascii_byte)]
    pub delimiter: u8,

    /// Quote character.
    #[arg(long, default_value = "\"", value_parser = parse_ascii_byte)]
    pub quote: u8,

    /// Escape character inside quoted fields.
    #[arg(long, default_value = "\\", value_parser = parse_ascii_byte, conflicts_with = "no_escape")]
    pub escape: u8,

    /// Disable the escape character.
    #[arg(long = "no-escape")]
    pub no_escape: bool,

    /// Fall back to the configured search paths.
    #[arg(long = "search-path")]
    pub search_path: bool,

    #[command(flatten)]
    pub output: OutputSink,
}

impl RecordsArgs {
    fn format(&self) -> RecordFormat {
        RecordFormat::default()
            .with_delimiter(self.delimiter)
            .with_quote(self.quote)
            .with_escape((!self.no_escape).then_some(self.escape))
    }

    pub async fn run(self, ctx: &CommandContext) -> Result<()> {
        let format = self.format();

        let mut storage = ctx.open_storage().await?;
        storage
            .open(&self.name, OpenMode::READ, self.search_path)
            .await?;
        let mut records = Vec::new();
        while let Some(record) = storage.read_record(&format).await? {
            records.push(record);
        }
        storage.close().await?;

        if ctx.json() {
            self.output.write(&records, true).await?;
        } else {
            let text = records
                .iter()
                .map(|record| record.join("\t"))
                .collect::<Vec<_>>()
                .join("\n");
            self.output.write_str(&text).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::cli::Command;
    use clap::Parser;

    #[test]
    fn test_records_format_from_args() {
        let cli = Cli::try_parse_from([
            "stow",
            "records",
            "data.tsv",
            "--delimiter",
            "tab",
            "--no-escape",
        ])
        .unwrap();
        let Command::Records(args) = cli.command else {
            panic!("expected records command");
        };

        assert_eq!(
            args.format(),
            RecordFormat {
                delimiter: b'\t',
                quote: b'"',
                escape: None,
            }
        );
    }

    #[test]
    fn test_put_mode_parsing() {
        let cli = Cli::try_parse_from(["stow", "put", "log.txt", "line", "--mode", "a"]).unwrap();
        let Command::Put(args) = cli.command else {
            panic!("expected put command");
        };
        assert_eq!(args.mode, OpenMode::APPEND);

        assert!(Cli::try_parse_from(["stow", "put", "log.txt", "--mode", "q"]).is_err());
    }
}
