//! Single-file backup, mutate, validate and decide sequence.
//!
//! [`OperationRunner`] walks one file through
//! `Idle -> BackedUp -> Mutated -> Validated -> {Accepted | RolledBack} -> Done`.
//! Whatever happens, the file is left either in its accepted mutated state or
//! byte-for-byte identical to its snapshot. The only exception is a failed
//! restore, which is surfaced as a fatal [`HarnessError`].

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backup::BackupStore;
use crate::error::{HarnessError, MutationError};
use crate::policy::{ThresholdConfig, accepts, accepts_against};
use crate::report::ValidationReport;
use crate::tool::{ProcessToolRunner, ToolRunner};
use crate::validator::Validator;

/// Tracing target for operation state transitions.
const RUNNER_TARGET: &str = "warden_harness::runner";

/// Lifecycle of a single guarded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    /// Nothing has happened yet.
    Idle,
    /// The file has been snapshotted.
    BackedUp,
    /// The mutation ran.
    Mutated,
    /// The mutated file has been validated.
    Validated,
    /// The mutation met the thresholds and was kept.
    Accepted,
    /// The file was restored from its snapshot.
    RolledBack,
    /// The operation finished.
    Done,
}

impl OperationState {
    /// Lower-case name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::BackedUp => "backed_up",
            Self::Mutated => "mutated",
            Self::Validated => "validated",
            Self::Accepted => "accepted",
            Self::RolledBack => "rolled_back",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a guarded operation that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationOutcome {
    success: bool,
    report: ValidationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    baseline: Option<ValidationReport>,
    final_state: OperationState,
}

impl OperationOutcome {
    /// Returns true when the mutation was accepted and kept.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.success
    }

    /// Report produced by validating the mutated file.
    #[must_use]
    pub const fn report(&self) -> &ValidationReport {
        &self.report
    }

    /// Report taken before the mutation when baseline comparison is on.
    #[must_use]
    pub const fn baseline(&self) -> Option<&ValidationReport> {
        self.baseline.as_ref()
    }

    /// Either [`OperationState::Accepted`] or [`OperationState::RolledBack`].
    #[must_use]
    pub const fn final_state(&self) -> OperationState {
        self.final_state
    }
}

/// Drives one file through the guarded mutation sequence.
pub struct OperationRunner<'a, R: ToolRunner = ProcessToolRunner> {
    store: &'a mut BackupStore,
    validator: &'a Validator<R>,
    state: OperationState,
}

impl<'a, R: ToolRunner> OperationRunner<'a, R> {
    /// Creates an idle runner over a session's store and a validator.
    #[must_use]
    pub const fn new(store: &'a mut BackupStore, validator: &'a Validator<R>) -> Self {
        Self {
            store,
            validator,
            state: OperationState::Idle,
        }
    }

    /// Resumes a file whose snapshot was taken and whose mutation already ran.
    pub(crate) const fn mutated(store: &'a mut BackupStore, validator: &'a Validator<R>) -> Self {
        Self {
            store,
            validator,
            state: OperationState::Mutated,
        }
    }

    /// Last state reached.
    ///
    /// After an error this is the state the operation was in when it failed.
    #[must_use]
    pub const fn state(&self) -> OperationState {
        self.state
    }

    /// Snapshots `path`, runs `mutation` once, validates and decides.
    ///
    /// A rejected mutation is rolled back and reported with
    /// `success == false`; rejection is not an error. When `thresholds`
    /// compare against a baseline, the file is also validated before the
    /// mutation runs.
    ///
    /// # Errors
    ///
    /// - [`HarnessError::Backup`] when the snapshot fails; the mutation is
    ///   not attempted.
    /// - [`HarnessError::MutationFailed`] when the mutation returns an error;
    ///   the file is restored first and any restore failure is attached.
    /// - [`HarnessError::Restore`] when rolling back a rejected mutation
    ///   fails.
    pub fn run<F>(
        &mut self,
        path: &Path,
        mutation: F,
        thresholds: &ThresholdConfig,
    ) -> Result<OperationOutcome, HarnessError>
    where
        F: FnOnce() -> Result<(), MutationError>,
    {
        self.store.snapshot(path)?;
        self.transition(path, OperationState::BackedUp);
        let baseline = thresholds
            .compares_to_baseline()
            .then(|| self.validator.validate(path));

        if let Err(source) = mutation() {
            warn!(
                target: RUNNER_TARGET,
                path = %path.display(),
                error = %source,
                "mutation failed, restoring snapshot"
            );
            let restore_failures = self.store.restore_each([path.to_path_buf()]);
            if restore_failures.is_empty() {
                self.transition(path, OperationState::RolledBack);
            }
            return Err(HarnessError::MutationFailed {
                source,
                restore_failures,
            });
        }
        self.transition(path, OperationState::Mutated);

        self.settle(path, thresholds, baseline)
    }

    /// Validates a mutated file and keeps or restores it, judging it against
    /// `baseline` when one was taken.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Restore`] when rolling back a rejected
    /// mutation fails.
    pub(crate) fn settle(
        &mut self,
        path: &Path,
        thresholds: &ThresholdConfig,
        baseline: Option<ValidationReport>,
    ) -> Result<OperationOutcome, HarnessError> {
        let report = self.validator.validate(path);
        self.transition(path, OperationState::Validated);

        let success = baseline.as_ref().map_or_else(
            || accepts(&report, thresholds),
            |before| accepts_against(before, &report, thresholds),
        );
        let final_state = if success {
            info!(
                target: RUNNER_TARGET,
                path = %path.display(),
                syntax_errors = report.syntax_errors(),
                build_errors = report.build_errors(),
                "mutation accepted"
            );
            OperationState::Accepted
        } else {
            warn!(
                target: RUNNER_TARGET,
                path = %path.display(),
                errors = ?report.errors(),
                syntax_errors = report.syntax_errors(),
                build_errors = report.build_errors(),
                "mutation rejected, restoring snapshot"
            );
            self.store.restore(path)?;
            OperationState::RolledBack
        };
        self.transition(path, final_state);
        self.transition(path, OperationState::Done);

        Ok(OperationOutcome {
            success,
            report,
            baseline,
            final_state,
        })
    }

    fn transition(&mut self, path: &Path, next: OperationState) {
        debug!(
            target: RUNNER_TARGET,
            path = %path.display(),
            from = %self.state,
            to = %next,
            "operation state changed"
        );
        self.state = next;
    }
}
