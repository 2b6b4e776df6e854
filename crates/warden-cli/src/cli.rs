//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Backup-verify-restore guard for file mutations.
///
/// Configuration flags such as `--max-syntax-errors` or `--snapshot-root`
/// must appear before the subcommand.
#[derive(Parser, Debug)]
#[command(name = "warden", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Validates files and prints one JSON report per file.
    Validate {
        /// Files to validate.
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },
    /// Runs a command as a guarded mutation of the given files.
    ///
    /// Files that fail validation afterwards are restored from their
    /// snapshots; files that pass keep the command's changes.
    Guard {
        /// File the command is expected to modify. Repeat for each file.
        #[arg(long = "file", value_name = "PATH", required = true)]
        files: Vec<PathBuf>,
        /// The mutating command and its arguments, after `--`.
        #[arg(value_name = "COMMAND", last = true, required = true)]
        command: Vec<String>,
    },
}
