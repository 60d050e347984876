//! Command-line interface for stowage.

pub mod args;
mod command_context;
mod commands;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::storage::StorageError;

pub use args::{GlobalArgs, InputSource, OutputSink};
pub use command_context::{CommandContext, CommandContextError, DEFAULT_STORAGE_NAME};
use commands::files::{CatArgs, PutArgs, RecordsArgs};
use commands::paths::{MkdirArgs, MvArgs, Probe, ProbeArgs, RetryUploadArgs, RmArgs};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during CLI execution.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument processing error.
    #[error("{0}")]
    Args(#[from] args::ArgsError),

    /// Configuration or storage selection error.
    #[error("{0}")]
    Context(#[from] CommandContextError),

    /// Storage operation error.
    #[error("{0}")]
    Storage(#[from] StorageError),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

// =============================================================================
// CLI Definition
// =============================================================================

/// stow - fopen-style access to local and S3-backed storage.
#[derive(Parser, Debug)]
#[command(name = "stow", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a file.
    Cat(CatArgs),

    /// Write a file.
    Put(PutArgs),

    /// Check whether a name exists.
    Exists(ProbeArgs),

    /// Check whether a name is a directory.
    #[command(name = "is-dir")]
    IsDir(ProbeArgs),

    /// Check whether a name can be written.
    #[command(name = "is-writable")]
    IsWritable(ProbeArgs),

    /// Create a directory.
    Mkdir(MkdirArgs),

    /// Rename a file.
    Mv(MvArgs),

    /// Delete a file.
    Rm(RmArgs),

    /// Print the delimited records of a file.
    Records(RecordsArgs),

    /// Upload a cached copy left behind by a failed write-back.
    #[command(name = "retry-upload")]
    RetryUpload(RetryUploadArgs),
}

// =============================================================================
// CLI Execution
// =============================================================================

impl Cli {
    /// Parse command-line arguments and return the CLI instance.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Run the CLI command.
    ///
    /// Returns false when a quiet probe answered no.
    pub async fn run(self) -> Result<bool> {
        let ctx = CommandContext::new(&self.global)?;

        match self.command {
            Command::Cat(args) => args.run(&ctx).await?,
            Command::Put(args) => args.run(&ctx).await?,
            Command::Exists(args) => return args.run(Probe::Exists, &ctx).await,
            Command::IsDir(args) => return args.run(Probe::IsDirectory, &ctx).await,
            Command::IsWritable(args) => return args.run(Probe::IsWritable, &ctx).await,
            Command::Mkdir(args) => args.run(&ctx).await?,
            Command::Mv(args) => args.run(&ctx).await?,
            Command::Rm(args) => args.run(&ctx).await?,
            Command::Records(args) => args.run(&ctx).await?,
            Command::RetryUpload(args) => args.run(&ctx).await?,
        }

        Ok(true)
    }
}

/// Install the stderr log subscriber at the level chosen by `-v`.
fn init_logging(global: &GlobalArgs) {
    tracing_subscriber::fmt()
        .with_max_level(global.log_level())
        .with_writer(std::io::stderr)
        .init();
}

/// Main entry point for the CLI.
pub async fn main() -> Result<bool> {
    let cli = Cli::parse_args();
    init_logging(&cli.global);
    cli.run().await
}
