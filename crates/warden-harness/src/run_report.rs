//! JSON record of one batch, written when a report directory is configured.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::batch::BatchOutcome;
use crate::error::HarnessError;
use crate::session::Session;

/// What a batch run did, when, and how it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    session: String,
    snapshot_directory: PathBuf,
    started_at: String,
    finished_at: String,
    elapsed_ms: u64,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch: Option<BatchOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl RunReport {
    /// Session the run belonged to.
    #[must_use]
    pub fn session(&self) -> &str {
        &self.session
    }

    /// Returns true when the batch ran and every path was accepted.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.success
    }

    /// Batch outcome, absent when the batch ended in an error.
    #[must_use]
    pub const fn batch(&self) -> Option<&BatchOutcome> {
        self.batch.as_ref()
    }

    /// Error that ended the batch, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Writes the report as `<directory>/<session>.report.json`, creating
    /// the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns the I/O error when the directory or file cannot be written.
    pub fn write_to(&self, directory: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(directory)?;
        let path = directory.join(format!("{}.report.json", self.session));
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(&path, json)?;
        Ok(path)
    }
}

/// Start time of a run, turned into a [`RunReport`] once it ends.
#[derive(Debug)]
pub(crate) struct RunClock {
    started_at: OffsetDateTime,
    started: Instant,
}

impl RunClock {
    pub(crate) fn start() -> Self {
        Self {
            started_at: OffsetDateTime::now_utc(),
            started: Instant::now(),
        }
    }

    pub(crate) fn finish(
        self,
        session: &Session,
        result: &Result<BatchOutcome, HarnessError>,
    ) -> RunReport {
        let (batch, error) = match result {
            Ok(outcome) => (Some(outcome.clone()), None),
            Err(failure) => (None, Some(failure.to_string())),
        };
        RunReport {
            session: session.id().to_owned(),
            snapshot_directory: session.directory().to_path_buf(),
            started_at: timestamp(self.started_at),
            finished_at: timestamp(OffsetDateTime::now_utc()),
            elapsed_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            success: batch.as_ref().is_some_and(BatchOutcome::success),
            batch,
            error,
        }
    }
}

fn timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}
