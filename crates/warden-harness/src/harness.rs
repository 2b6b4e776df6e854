//! Caller-facing entry point bundling a session with a validator.

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};
use warden_config::Config;

use crate::backup::{BackupEntry, BackupStore};
use crate::batch::{BatchCoordinator, BatchOutcome};
use crate::error::{HarnessError, MutationError};
use crate::policy::ThresholdConfig;
use crate::report::ValidationReport;
use crate::run_report::RunClock;
use crate::runner::{OperationOutcome, OperationRunner};
use crate::session::Session;
use crate::tool::{ProcessToolRunner, ToolRunner};
use crate::validator::{Validator, ValidatorSettings};

/// Tracing target for harness lifecycle events.
const HARNESS_TARGET: &str = "warden_harness::harness";

/// One session's snapshot store plus the validator used to judge mutations.
///
/// Snapshots persist across single-file operations until [`Harness::cleanup`]
/// is called; a batch tears the session down itself when it ends. With a
/// report directory set, every batch leaves a JSON [`RunReport`] there.
///
/// [`RunReport`]: crate::RunReport
#[derive(Debug)]
pub struct Harness<R: ToolRunner = ProcessToolRunner> {
    store: BackupStore,
    validator: Validator<R>,
    report_dir: Option<PathBuf>,
}

impl Harness<ProcessToolRunner> {
    /// Starts a session under the configured snapshot root with the
    /// configured checker tools and report directory.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let session = Session::new(config.snapshot_root());
        let validator = Validator::from_settings(&ValidatorSettings::from_config(config));
        Self {
            report_dir: config.report_dir().map(|dir| dir.as_std_path().to_path_buf()),
            ..Self::new(session, validator)
        }
    }
}

impl<R: ToolRunner> Harness<R> {
    /// Creates a harness for `session` judging mutations with `validator`.
    #[must_use]
    pub fn new(session: Session, validator: Validator<R>) -> Self {
        info!(
            target: HARNESS_TARGET,
            session = session.id(),
            directory = %session.directory().display(),
            "session started"
        );
        Self {
            store: BackupStore::new(session),
            validator,
            report_dir: None,
        }
    }

    /// Writes a run report into `directory` after every batch.
    #[must_use]
    pub fn with_report_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.report_dir = Some(directory.into());
        self
    }

    /// Directory receiving run reports, if any.
    #[must_use]
    pub fn report_dir(&self) -> Option<&Path> {
        self.report_dir.as_deref()
    }

    /// Session this harness operates in.
    #[must_use]
    pub const fn session(&self) -> &Session {
        self.store.session()
    }

    /// Validator used by every operation.
    #[must_use]
    pub const fn validator(&self) -> &Validator<R> {
        &self.validator
    }

    /// Snapshots `path` ahead of a manual mutation.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Backup`] when the snapshot cannot be taken.
    pub fn create_backup(&mut self, path: &Path) -> Result<&BackupEntry, HarnessError> {
        self.store.snapshot(path)
    }

    /// Validates `path` without touching it.
    #[must_use]
    pub fn validate_file(&self, path: &Path) -> ValidationReport {
        self.validator.validate(path)
    }

    /// Restores `path` from its snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NoBackup`] when `path` has no snapshot and
    /// [`HarnessError::Restore`] when it cannot be written.
    pub fn restore_backup(&self, path: &Path) -> Result<(), HarnessError> {
        self.store.restore(path)
    }

    /// Guards a single-file mutation.
    ///
    /// # Errors
    ///
    /// See [`OperationRunner::run`].
    #[instrument(skip_all, fields(session = self.session().id(), path = %path.display()))]
    pub fn safe_file_operation<F>(
        &mut self,
        path: &Path,
        mutation: F,
        thresholds: &ThresholdConfig,
    ) -> Result<OperationOutcome, HarnessError>
    where
        F: FnOnce() -> Result<(), MutationError>,
    {
        OperationRunner::new(&mut self.store, &self.validator).run(path, mutation, thresholds)
    }

    /// Guards one mutation spanning several files.
    ///
    /// A report directory, when set, receives the run report whether or not
    /// the batch succeeded. Failing to write it is logged and does not change
    /// the result.
    ///
    /// # Errors
    ///
    /// See [`BatchCoordinator::run`].
    #[instrument(skip_all, fields(session = self.session().id(), files = paths.len()))]
    pub fn run_batch<F>(
        &mut self,
        paths: &[PathBuf],
        mutation: F,
        thresholds: &ThresholdConfig,
    ) -> Result<BatchOutcome, HarnessError>
    where
        F: FnOnce() -> Result<(), MutationError>,
    {
        let clock = RunClock::start();
        let result =
            BatchCoordinator::new(&mut self.store, &self.validator).run(paths, mutation, thresholds);

        if let Some(directory) = &self.report_dir {
            let report = clock.finish(self.store.session(), &result);
            match report.write_to(directory) {
                Ok(written) => info!(
                    target: HARNESS_TARGET,
                    report = %written.display(),
                    "run report written"
                ),
                Err(error) => warn!(
                    target: HARNESS_TARGET,
                    directory = %directory.display(),
                    %error,
                    "failed to write run report"
                ),
            }
        }
        result
    }

    /// Paths with a snapshot in this session, sorted.
    #[must_use]
    pub fn list_backups(&self) -> Vec<PathBuf> {
        self.store.backed_up_paths()
    }

    /// Restores every snapshotted file.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::RestoreIncomplete`] naming each file that
    /// could not be restored.
    pub fn restore_all(&self) -> Result<(), HarnessError> {
        self.store.restore_all()
    }

    /// Deletes the session's snapshots. Later restores fail with
    /// [`HarnessError::NoBackup`].
    #[instrument(skip_all, fields(session = self.session().id()))]
    pub fn cleanup(&mut self) {
        self.store.teardown();
        info!(target: HARNESS_TARGET, session = self.session().id(), "session cleaned up");
    }
}
