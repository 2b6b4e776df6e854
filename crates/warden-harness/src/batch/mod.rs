//! Multi-file operations sharing a single mutation.
//!
//! The batch protects every path before the mutation runs and settles each
//! path independently afterwards: files that pass keep their mutation, files
//! that fail are restored on their own. The session's snapshots are torn
//! down when the batch ends, unless a restore failed: then every other file
//! is reverted and the snapshots stay on disk for manual recovery.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::backup::BackupStore;
use crate::error::{HarnessError, MutationError};
use crate::policy::ThresholdConfig;
use crate::report::ValidationReport;
use crate::runner::{OperationOutcome, OperationRunner};
use crate::tool::{ProcessToolRunner, ToolRunner};
use crate::validator::Validator;

/// Tracing target for batch operations.
const BATCH_TARGET: &str = "warden_harness::batch";

/// Outcome for one path of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathOutcome {
    path: PathBuf,
    #[serde(flatten)]
    outcome: OperationOutcome,
}

impl PathOutcome {
    /// The file this outcome describes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validation and decision for the file.
    #[must_use]
    pub const fn outcome(&self) -> &OperationOutcome {
        &self.outcome
    }
}

/// Aggregated result of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    success: bool,
    outcomes: Vec<PathOutcome>,
    failures: Vec<String>,
}

impl BatchOutcome {
    /// Returns true only when every path was accepted.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.success
    }

    /// Per-path outcomes in input order.
    #[must_use]
    pub fn outcomes(&self) -> &[PathOutcome] {
        &self.outcomes
    }

    /// One `"<path>: <errors>"` entry per rejected path.
    #[must_use]
    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

/// Tears the session down when the batch ends, including on early return.
struct TeardownGuard<'s> {
    store: &'s mut BackupStore,
    keep: bool,
}

impl<'s> TeardownGuard<'s> {
    const fn new(store: &'s mut BackupStore) -> Self {
        Self { store, keep: false }
    }

    /// Leaves the snapshots in place because a file could not be restored.
    fn keep_snapshots(&mut self) {
        warn!(
            target: BATCH_TARGET,
            session = self.store.session().id(),
            directory = %self.store.session().directory().display(),
            "restore incomplete, keeping snapshots for manual recovery"
        );
        self.keep = true;
    }
}

impl Drop for TeardownGuard<'_> {
    fn drop(&mut self) {
        if !self.keep {
            self.store.teardown();
        }
    }
}

/// Runs one mutation over several files within a session.
pub struct BatchCoordinator<'a, R: ToolRunner = ProcessToolRunner> {
    store: &'a mut BackupStore,
    validator: &'a Validator<R>,
}

impl<'a, R: ToolRunner> BatchCoordinator<'a, R> {
    /// Creates a coordinator over a session's store and a validator.
    #[must_use]
    pub const fn new(store: &'a mut BackupStore, validator: &'a Validator<R>) -> Self {
        Self { store, validator }
    }

    /// Snapshots `paths`, runs `mutation` once and settles every path.
    ///
    /// With baseline comparison enabled in `thresholds`, every path is
    /// validated after the snapshots and before the mutation.
    ///
    /// # Errors
    ///
    /// - [`HarnessError::Backup`] when any snapshot fails; nothing is
    ///   mutated.
    /// - [`HarnessError::MutationFailed`] when the mutation returns an error;
    ///   every snapshotted file is restored first.
    /// - [`HarnessError::RestoreIncomplete`] when a rejected file cannot be
    ///   restored. Every path is still settled, then every other file is
    ///   reverted to its snapshot and the snapshots are kept.
    pub fn run<F>(
        &mut self,
        paths: &[PathBuf],
        mutation: F,
        thresholds: &ThresholdConfig,
    ) -> Result<BatchOutcome, HarnessError>
    where
        F: FnOnce() -> Result<(), MutationError>,
    {
        let mut guard = TeardownGuard::new(&mut *self.store);

        for path in paths {
            guard.store.snapshot(path)?;
        }
        info!(target: BATCH_TARGET, files = paths.len(), "batch snapshotted");

        let baselines: Vec<Option<ValidationReport>> = paths
            .iter()
            .map(|path| {
                thresholds
                    .compares_to_baseline()
                    .then(|| self.validator.validate(path))
            })
            .collect();

        if let Err(source) = mutation() {
            warn!(
                target: BATCH_TARGET,
                error = %source,
                "batch mutation failed, restoring every file"
            );
            let restore_failures = guard.store.restore_each(guard.store.backed_up_paths());
            if !restore_failures.is_empty() {
                guard.keep_snapshots();
            }
            return Err(HarnessError::MutationFailed {
                source,
                restore_failures,
            });
        }

        let mut outcomes = Vec::with_capacity(paths.len());
        let mut failures = Vec::new();
        let mut unrestored = Vec::new();
        let mut restore_failures = Vec::new();
        for (path, baseline) in paths.iter().zip(baselines) {
            let settled = OperationRunner::mutated(&mut *guard.store, self.validator)
                .settle(path, thresholds, baseline);
            match settled {
                Ok(outcome) => {
                    if !outcome.success() {
                        failures.push(format!(
                            "{}: {}",
                            path.display(),
                            outcome.report().errors().join(", ")
                        ));
                    }
                    outcomes.push(PathOutcome {
                        path: path.clone(),
                        outcome,
                    });
                }
                Err(error) => {
                    warn!(
                        target: BATCH_TARGET,
                        path = %path.display(),
                        %error,
                        "rejected file could not be restored"
                    );
                    restore_failures.push(format!("{}: {error}", path.display()));
                    unrestored.push(std::path::absolute(path).unwrap_or_else(|_| path.clone()));
                }
            }
        }

        if !restore_failures.is_empty() {
            let others: Vec<PathBuf> = guard
                .store
                .backed_up_paths()
                .into_iter()
                .filter(|path| !unrestored.contains(path))
                .collect();
            warn!(
                target: BATCH_TARGET,
                unrestored = unrestored.len(),
                reverting = others.len(),
                "batch safety net compromised, reverting every other file"
            );
            restore_failures.extend(guard.store.restore_each(others));
            guard.keep_snapshots();
            return Err(HarnessError::RestoreIncomplete {
                failures: restore_failures,
            });
        }

        let success = failures.is_empty();
        info!(
            target: BATCH_TARGET,
            files = paths.len(),
            rejected = failures.len(),
            success,
            "batch finished"
        );
        Ok(BatchOutcome {
            success,
            outcomes,
            failures,
        })
    }
}
