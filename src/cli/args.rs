//! Command-line argument definitions and helpers.

use std::path::PathBuf;

use clap::Args;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::config::ConfigSource;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during argument processing.
#[derive(Debug, Error)]
pub enum ArgsError {
    /// I/O error reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid argument combination.
    #[error("{0}")]
    InvalidArgs(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for argument operations.
pub type Result<T> = std::result::Result<T, ArgsError>;

// =============================================================================
// Global Arguments
// =============================================================================

/// Global arguments that apply to all commands.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Path to the main configuration file.
    #[arg(long = "config-file", global = true)]
    pub config_file: Option<PathBuf>,

    /// Path to the configuration overrides file.
    #[arg(long = "config-file-overrides", global = true)]
    pub config_file_overrides: Option<PathBuf>,

    /// Configuration overrides in the form name=value.
    #[arg(long = "config", value_parser = parse_config_override, global = true)]
    pub config_overrides: Vec<(String, String)>,

    /// Storage specification (file:// URL, s3:// URL, or named storage).
    /// If not specified, the storage named "default" is used.
    #[arg(long = "storage", short = 's', global = true)]
    pub storage: Option<String>,

    /// Format output as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl GlobalArgs {
    /// Convert to a ConfigSource for reading configuration.
    pub fn to_config_source(&self) -> ConfigSource {
        ConfigSource {
            config_file: self.config_file.clone(),
            override_file: self.config_file_overrides.clone(),
            overrides: self.config_overrides.clone(),
        }
    }

    /// The most detailed level to log at.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

/// Parse a config override from "name=value" format.
fn parse_config_override(s: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid config override '{}': expected name=value", s))?;
    Ok((name.to_string(), value.to_string()))
}

/// Parse permission bits written in octal, e.g. "755".
pub fn parse_octal_mode(s: &str) -> std::result::Result<u32, String> {
    u32::from_str_radix(s.strip_prefix("0o").unwrap_or(s), 8)
        .map_err(|e| format!("invalid mode '{}': {}", s, e))
}

/// Parse a single ASCII character used as a record delimiter, quote or escape.
pub fn parse_ascii_byte(s: &str) -> std::result::Result<u8, String> {
    let value = match s {
        "\\t" | "tab" => "\t",
        other => other,
    };
    match value.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(format!("expected a single ASCII character, got '{}'", s)),
    }
}

// =============================================================================
// Input/Output Helpers
// =============================================================================

/// Helper for commands that read input from an argument, file, or stdin.
#[derive(Args, Debug, Default)]
pub struct InputSource {
    /// Read input from this file instead of an argument.
    #[arg(id = "input_file", short = 'f', long = "input-file")]
    pub file: Option<PathBuf>,
}

impl InputSource {
    /// Read the input bytes.
    ///
    /// If `arg_value` is provided, returns it (error if file is also set).
    /// If `file` is set, reads from the file.
    /// Otherwise, reads from stdin.
    pub async fn read_bytes(&self, arg_value: Option<&str>) -> Result<Vec<u8>> {
        match (arg_value, &self.file) {
            (Some(_), Some(_)) => Err(ArgsError::InvalidArgs(
                "cannot specify both a value argument and --input-file".to_string(),
            )),
            (Some(value), None) => Ok(value.as_bytes().to_vec()),
            (None, Some(path)) => Ok(tokio::fs::read(path).await?),
            (None, None) => {
                let mut contents = Vec::new();
                tokio::io::stdin().read_to_end(&mut contents).await?;
                Ok(contents)
            }
        }
    }
}

/// Helper for commands that write output to a file or stdout.
#[derive(Args, Debug, Default)]
pub struct OutputSink {
    /// Write output to this file instead of stdout.
    #[arg(id = "output_file", short = 'o', long = "output-file")]
    pub file: Option<PathBuf>,
}

impl OutputSink {
    /// Write a string value to the output.
    pub async fn write_str(&self, value: &str) -> Result<()> {
        match &self.file {
            Some(path) => {
                tokio::fs::write(path, value).await?;
            }
            None => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(value.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }
        Ok(())
    }

    /// Write a value to the output, optionally as JSON.
    pub async fn write<T: serde::Serialize>(&self, value: &T, json: bool) -> Result<()> {
        let output = if json {
            serde_json::to_string_pretty(value)?
        } else {
            match serde_json::to_value(value)? {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }
        };
        self.write_str(&output).await
    }

    /// Write raw bytes to the output.
    pub async fn write_bytes(&self, data: &[u8]) -> Result<()> {
        match &self.file {
            Some(path) => {
                tokio::fs::write(path, data).await?;
            }
            None => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(data).await?;
                stdout.flush().await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config_override() {
        assert_eq!(
            parse_config_override("storage.docs.url=file:///a=b").unwrap(),
            ("storage.docs.url".to_string(), "file:///a=b".to_string())
        );
        assert!(parse_config_override("cache.path").is_err());
    }

    #[test]
    fn test_parse_octal_mode() {
        assert_eq!(parse_octal_mode("755").unwrap(), 0o755);
        assert_eq!(parse_octal_mode("0o700").unwrap(), 0o700);
        assert!(parse_octal_mode("9").is_err());
    }

    #[test]
    fn test_parse_ascii_byte() {
        assert_eq!(parse_ascii_byte(";").unwrap(), b';');
        assert_eq!(parse_ascii_byte("\\t").unwrap(), b'\t');
        assert!(parse_ascii_byte("ab").is_err());
        assert!(parse_ascii_byte("é").is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = GlobalArgs::default();
        assert_eq!(args.log_level(), tracing::Level::WARN);
        args.verbose = 2;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);
        args.verbose = 9;
        assert_eq!(args.log_level(), tracing::Level::TRACE);
    }

    #[tokio::test]
    async fn test_input_source() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("input.bin");
        tokio::fs::write(&path, b"\x00raw\n").await.unwrap();

        let from_arg = InputSource::default();
        assert_eq!(from_arg.read_bytes(Some("value")).await.unwrap(), b"value");

        let from_file = InputSource { file: Some(path) };
        assert_eq!(from_file.read_bytes(None).await.unwrap(), b"\x00raw\n");
        assert!(matches!(
            from_file.read_bytes(Some("value")).await,
            Err(ArgsError::InvalidArgs(_))
        ));
    }

    #[tokio::test]
    async fn test_output_sink_writes_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.json");
        let sink = OutputSink {
            file: Some(path.clone()),
        };

        sink.write(&vec!["a", "b"], true).await.unwrap();
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(
            serde_json::from_str::<Vec<String>>(&written).unwrap(),
            vec!["a", "b"]
        );
    }
}
