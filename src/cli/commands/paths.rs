//! Commands that inspect or change names rather than contents.

use clap::Args;
use serde::Serialize;

use crate::cli::args::parse_octal_mode;
use crate::cli::{CommandContext, OutputSink, Result};

/// Which existence-style question to ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Exists,
    IsDirectory,
    IsWritable,
}

// =============================================================================
// Probes (exists, is-dir, is-writable)
// =============================================================================

/// Arguments for the exists, is-dir and is-writable commands.
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Name to check.
    pub name: String,

    /// Exit with status 1 instead of printing false.
    #[arg(short, long)]
    pub quiet: bool,

    #[command(flatten)]
    pub output: OutputSink,
}

#[derive(Debug, Serialize)]
struct ProbeOutput<'a> {
    name: &'a str,
    result: bool,
}

impl ProbeArgs {
    /// Returns the answer so the caller can set the exit status.
    pub async fn run(self, probe: Probe, ctx: &CommandContext) -> Result<bool> {
        let storage = ctx.open_storage().await?;
        let result = match probe {
            Probe::Exists => storage.exists(&self.name).await,
            Probe::IsDirectory => storage.is_directory(&self.name).await,
            Probe::IsWritable => storage.is_writable(&self.name).await,
        };

        if self.quiet {
            return Ok(result);
        }

        if ctx.json() {
            let output = ProbeOutput {
                name: &self.name,
                result,
            };
            self.output.write(&output, true).await?;
        } else {
            self.output.write(&result, false).await?;
        }
        Ok(true)
    }
}

// =============================================================================
// Mkdir
// =============================================================================

/// Arguments for the mkdir command.
#[derive(Args, Debug)]
pub struct MkdirArgs {
    /// Directory to create.
    pub path: String,

    /// Permission bits in octal; defaults to the configured directory_mode.
    #[arg(short, long, value_parser = parse_octal_mode)]
    pub mode: Option<u32>,

    /// Create missing parent directories.
    #[arg(short, long)]
    pub parents: bool,
}

impl MkdirArgs {
    pub async fn run(self, ctx: &CommandContext) -> Result<()> {
        let storage = ctx.open_storage().await?;
        storage
            .make_directory(&self.path, self.mode, self.parents)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Mv
// =============================================================================

/// Arguments for the mv command.
#[derive(Args, Debug)]
pub struct MvArgs {
    /// Existing name.
    pub from: String,

    /// New name.
    pub to: String,
}

impl MvArgs {
    pub async fn run(self, ctx: &CommandContext) -> Result<()> {
        let mut storage = ctx.open_storage().await?;
        storage.rename(&self.from, &self.to).await?;
        Ok(())
    }
}

// =============================================================================
// Rm
// =============================================================================

/// Arguments for the rm command.
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Name to delete.
    pub name: String,

    /// Succeed if the name does not exist.
    #[arg(short, long)]
    pub force: bool,
}

impl RmArgs {
    pub async fn run(self, ctx: &CommandContext) -> Result<()> {
        let mut storage = ctx.open_storage().await?;
        if self.force && !storage.exists(&self.name).await {
            return Ok(());
        }
        storage.delete(&self.name).await?;
        Ok(())
    }
}

// =============================================================================
// Retry Upload
// =============================================================================

/// Arguments for the retry-upload command.
#[derive(Args, Debug)]
pub struct RetryUploadArgs {
    /// Name whose cached copy failed to upload.
    pub name: String,
}

impl RetryUploadArgs {
    pub async fn run(self, ctx: &CommandContext) -> Result<()> {
        let mut storage = ctx.open_remote_storage().await?;
        storage.retry_upload(&self.name).await?;
        Ok(())
    }
}
