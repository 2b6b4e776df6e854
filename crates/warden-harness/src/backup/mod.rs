//! Session-scoped snapshot storage.
//!
//! The [`BackupStore`] is the only component that reads or writes snapshot
//! bytes. Each snapshot is kept twice: in memory, as the source of truth for
//! restoration, and on disk inside the session directory so an operator can
//! recover files by hand if the process dies mid-mutation. Entries are keyed
//! by absolute path, so `./a.ts` and `a.ts` name the same snapshot.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::error::HarnessError;
use crate::session::Session;

/// Tracing target for snapshot operations.
const BACKUP_TARGET: &str = "warden_harness::backup";

/// One captured copy of a file's original content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    source: PathBuf,
    snapshot: PathBuf,
    original: Vec<u8>,
    captured_at: OffsetDateTime,
    checksum: String,
}

impl BackupEntry {
    fn capture(source: PathBuf, snapshot: PathBuf, original: Vec<u8>) -> Self {
        Self {
            checksum: digest(&original),
            source,
            snapshot,
            original,
            captured_at: OffsetDateTime::now_utc(),
        }
    }

    /// Path of the protected file.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Path of the on-disk snapshot copy.
    #[must_use]
    pub fn snapshot(&self) -> &Path {
        &self.snapshot
    }

    /// Original bytes captured before the mutation.
    #[must_use]
    pub fn original(&self) -> &[u8] {
        &self.original
    }

    /// Moment the snapshot was taken.
    #[must_use]
    pub const fn captured_at(&self) -> OffsetDateTime {
        self.captured_at
    }

    /// Hex-encoded SHA-256 digest of the original bytes, checked against the
    /// live file after every restore.
    #[must_use]
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

}

/// Snapshot store owned by a single [`Session`].
#[derive(Debug)]
pub struct BackupStore {
    session: Session,
    entries: HashMap<PathBuf, BackupEntry>,
}

impl BackupStore {
    /// Creates an empty store for `session`.
    ///
    /// The snapshot directory is created lazily by the first snapshot.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session,
            entries: HashMap::new(),
        }
    }

    /// Session this store belongs to.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Captures the current content of `path`.
    ///
    /// Snapshotting a path that already has an entry replaces that entry.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Backup`] when the file cannot be read or the
    /// snapshot directory or copy cannot be written.
    pub fn snapshot(&mut self, path: &Path) -> Result<&BackupEntry, HarnessError> {
        let key = std::path::absolute(path).map_err(|error| {
            HarnessError::backup(path.to_path_buf(), "failed to resolve path", error)
        })?;
        let original = fs::read(&key).map_err(|error| {
            HarnessError::backup(path.to_path_buf(), "failed to read source", error)
        })?;

        let directory = self.session.directory();
        fs::create_dir_all(directory).map_err(|error| {
            HarnessError::backup(
                path.to_path_buf(),
                "failed to create snapshot directory",
                error,
            )
        })?;

        let snapshot_path = self.session.snapshot_path_for(&key);
        fs::write(&snapshot_path, &original).map_err(|error| {
            HarnessError::backup(path.to_path_buf(), "failed to write snapshot", error)
        })?;

        let entry = BackupEntry::capture(key.clone(), snapshot_path, original);
        info!(
            target: BACKUP_TARGET,
            session = self.session.id(),
            path = %path.display(),
            bytes = entry.original.len(),
            checksum = %entry.checksum,
            "snapshot captured"
        );

        Ok(match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(entry);
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(entry),
        })
    }

    /// Overwrites `path` with its recorded original bytes.
    ///
    /// The file is read back after writing and its digest compared with the
    /// checksum taken at snapshot time.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NoBackup`] when `path` was never snapshotted in
    /// this session, and [`HarnessError::Restore`] when the live file cannot
    /// be written or does not read back as the snapshot.
    pub fn restore(&self, path: &Path) -> Result<(), HarnessError> {
        let entry = self.entry(path).ok_or_else(|| HarnessError::NoBackup {
            path: path.to_path_buf(),
        })?;

        fs::write(&entry.source, &entry.original)
            .map_err(|error| HarnessError::restore(path.to_path_buf(), &error))?;
        verify_written(&entry.source, &entry.checksum)?;

        info!(
            target: BACKUP_TARGET,
            session = self.session.id(),
            path = %path.display(),
            "file restored from snapshot"
        );
        Ok(())
    }

    /// Restores every snapshotted file, continuing past individual failures.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::RestoreIncomplete`] naming each file that could
    /// not be restored.
    pub fn restore_all(&self) -> Result<(), HarnessError> {
        let failures = self.restore_each(self.backed_up_paths());
        if failures.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::RestoreIncomplete { failures })
        }
    }

    /// Restores the given paths, returning a `path: reason` entry per failure.
    pub(crate) fn restore_each<I>(&self, paths: I) -> Vec<String>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        paths
            .into_iter()
            .filter_map(|path| {
                self.restore(&path)
                    .err()
                    .map(|error| format!("{}: {error}", path.display()))
            })
            .collect()
    }

    /// Deletes the session directory and forgets every snapshot.
    ///
    /// Teardown never fails; problems removing the directory are logged.
    pub fn teardown(&mut self) {
        let directory = self.session.directory();
        match fs::remove_dir_all(directory) {
            Ok(()) => debug!(
                target: BACKUP_TARGET,
                session = self.session.id(),
                "snapshot directory removed"
            ),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => warn!(
                target: BACKUP_TARGET,
                session = self.session.id(),
                directory = %directory.display(),
                %error,
                "failed to remove snapshot directory"
            ),
        }
        self.entries.clear();
    }

    /// Snapshot recorded for `path`, if any.
    #[must_use]
    pub fn entry(&self, path: &Path) -> Option<&BackupEntry> {
        std::path::absolute(path)
            .ok()
            .and_then(|key| self.entries.get(&key))
    }

    /// All recorded snapshots, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = &BackupEntry> {
        self.entries.values()
    }

    /// Paths with a recorded snapshot, sorted.
    #[must_use]
    pub fn backed_up_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.entries.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Number of recorded snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no snapshot is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Confirms that `path` now holds bytes matching `checksum`.
fn verify_written(path: &Path, checksum: &str) -> Result<(), HarnessError> {
    let written = fs::read(path).map_err(|error| HarnessError::restore(path.to_path_buf(), &error))?;
    if digest(&written) == checksum {
        Ok(())
    } else {
        Err(HarnessError::Restore {
            path: path.to_path_buf(),
            message: String::from("restored content does not match the snapshot checksum"),
        })
    }
}

fn digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
