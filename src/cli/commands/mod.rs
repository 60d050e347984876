//! Subcommand implementations.

pub mod files;
pub mod paths;
