//! Error types for the backup-verify-restore harness.
//!
//! Only failures of the harness's own safety net are errors. Validation
//! problems, including checker tools that cannot run, are folded into a
//! [`ValidationReport`](crate::ValidationReport), and policy rejections are
//! ordinary [`OperationOutcome`](crate::OperationOutcome) values.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Error produced by a caller-supplied mutation closure.
pub type MutationError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A snapshot could not be taken; no mutation was attempted.
    #[error("failed to snapshot {path}: {message}")]
    Backup {
        /// File that was being protected.
        path: PathBuf,
        /// Description of the failure.
        message: String,
        /// Underlying I/O error, when there is one.
        #[source]
        source: Option<Arc<io::Error>>,
    },

    /// A restore was requested for a path that was never snapshotted.
    #[error("no snapshot recorded for {path}")]
    NoBackup {
        /// Path that has no snapshot in the current session.
        path: PathBuf,
    },

    /// Writing the snapshot back over the live file failed.
    #[error("failed to restore {path}: {message}")]
    Restore {
        /// File that could not be restored.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// Several files could not be restored while rolling back a session.
    #[error("failed to restore {} file(s): {}", .failures.len(), .failures.join("; "))]
    RestoreIncomplete {
        /// One `path: reason` entry per file left unrestored.
        failures: Vec<String>,
    },

    /// The caller's mutation failed. Every protected file was rolled back
    /// before this error was returned, unless `restore_failures` says
    /// otherwise.
    #[error("mutation failed: {source}")]
    MutationFailed {
        /// The error returned by the mutation closure.
        #[source]
        source: MutationError,
        /// Restores that failed while undoing the mutation.
        restore_failures: Vec<String>,
    },
}

impl HarnessError {
    /// Creates a snapshot error caused by an I/O failure.
    pub(crate) fn backup(path: PathBuf, message: &str, error: io::Error) -> Self {
        Self::Backup {
            path,
            message: format!("{message}: {error}"),
            source: Some(Arc::new(error)),
        }
    }

    /// Creates a restore error caused by an I/O failure.
    pub(crate) fn restore(path: PathBuf, error: &io::Error) -> Self {
        Self::Restore {
            path,
            message: error.to_string(),
        }
    }

    /// Returns true when the harness's own safety net failed and the file
    /// system may hold unvalidated content.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Restore { .. } | Self::RestoreIncomplete { .. } => true,
            Self::MutationFailed {
                restore_failures, ..
            } => !restore_failures.is_empty(),
            Self::Backup { .. } | Self::NoBackup { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_error_keeps_io_source() {
        let error = HarnessError::backup(
            PathBuf::from("src/app.ts"),
            "failed to read source",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );

        let display = error.to_string();
        assert!(display.contains("src/app.ts"));
        assert!(display.contains("denied"));
        assert!(std::error::Error::source(&error).is_some());
        assert!(!error.is_fatal());
    }

    #[test]
    fn mutation_failure_is_fatal_only_when_rollback_failed() {
        let clean = HarnessError::MutationFailed {
            source: "boom".into(),
            restore_failures: Vec::new(),
        };
        assert!(!clean.is_fatal());
        assert_eq!(clean.to_string(), "mutation failed: boom");

        let broken = HarnessError::MutationFailed {
            source: "boom".into(),
            restore_failures: vec![String::from("a.ts: disk full")],
        };
        assert!(broken.is_fatal());
    }

    #[test]
    fn incomplete_restore_lists_each_failure() {
        let error = HarnessError::RestoreIncomplete {
            failures: vec![String::from("a.ts: denied"), String::from("b.ts: denied")],
        };
        let display = error.to_string();
        assert!(display.starts_with("failed to restore 2 file(s)"));
        assert!(display.contains("a.ts: denied; b.ts: denied"));
        assert!(error.is_fatal());
    }
}
