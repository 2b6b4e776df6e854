//! Session identity and snapshot directory layout.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Distinguishes sessions created within the same millisecond.
static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Isolation scope for one logical change.
///
/// Each session owns a dedicated snapshot directory named after its
/// identifier, so concurrent sessions never share snapshot files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    directory: PathBuf,
}

impl Session {
    /// Starts a session whose snapshot directory lives under `root`.
    ///
    /// The identifier is the creation time in milliseconds since the Unix
    /// epoch followed by a process-local sequence number.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        let now = OffsetDateTime::now_utc();
        let millis = i128::from(now.unix_timestamp())
            .saturating_mul(1000)
            .saturating_add(i128::from(now.millisecond()));
        let sequence = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self::with_id(root, format!("{millis}-{sequence}"))
    }

    /// Starts a session with an explicit identifier.
    #[must_use]
    pub fn with_id(root: impl AsRef<Path>, id: impl Into<String>) -> Self {
        let identifier: String = id.into();
        Self {
            directory: root.as_ref().join(&identifier),
            id: identifier,
        }
    }

    /// Unique session identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Directory holding this session's snapshot files.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Snapshot file location for `source`.
    ///
    /// The source path is made relative to the working directory where
    /// possible and its separators are replaced so every snapshot sits
    /// directly inside the session directory. Flattening can map distinct
    /// paths to the same name, so the name also carries a short digest of
    /// the full source path.
    #[must_use]
    pub fn snapshot_path_for(&self, source: &Path) -> PathBuf {
        let relative = std::env::current_dir()
            .ok()
            .and_then(|cwd| source.strip_prefix(cwd).ok().map(Path::to_path_buf))
            .unwrap_or_else(|| source.to_path_buf());
        self.directory.join(format!(
            "{}.{}.backup",
            sanitise(&relative),
            path_tag(source)
        ))
    }
}

/// First eight hex digits of the SHA-256 of `source`.
fn path_tag(source: &Path) -> String {
    Sha256::digest(source.as_os_str().as_encoded_bytes())
        .iter()
        .take(4)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Flattens a path into a single file name.
fn sanitise(path: &Path) -> String {
    path.to_string_lossy()
        .trim_start_matches("./")
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn sessions_get_distinct_directories() {
        let first = Session::new("/tmp/snapshots");
        let second = Session::new("/tmp/snapshots");
        assert_ne!(first.id(), second.id());
        assert_ne!(first.directory(), second.directory());
        assert!(first.directory().starts_with("/tmp/snapshots"));
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .expect("snapshot file name")
            .to_string_lossy()
            .into_owned()
    }

    #[rstest]
    #[case("src/app/api/route.ts", "src_app_api_route.ts.")]
    #[case("./lib/util.js", "lib_util.js.")]
    #[case("notes.txt", "notes.txt.")]
    fn snapshot_names_are_flat(#[case] source: &str, #[case] prefix: &str) {
        let session = Session::with_id("/snapshots", "42-0");
        let path = session.snapshot_path_for(Path::new(source));

        assert_eq!(path.parent(), Some(Path::new("/snapshots/42-0")));
        let name = file_name(&path);
        assert!(name.starts_with(prefix), "unexpected name {name}");
        assert!(name.ends_with(".backup"));
        assert_eq!(name.len(), prefix.len() + 8 + ".backup".len());
    }

    #[rstest]
    fn flattened_collisions_get_distinct_snapshot_files() {
        let session = Session::with_id("/snapshots", "7-0");
        let nested = session.snapshot_path_for(Path::new("a/b.ts"));
        let flat = session.snapshot_path_for(Path::new("a_b.ts"));

        assert!(file_name(&nested).starts_with("a_b.ts."));
        assert!(file_name(&flat).starts_with("a_b.ts."));
        assert_ne!(nested, flat);
    }

    #[rstest]
    fn absolute_paths_inside_working_directory_become_relative() {
        let cwd = std::env::current_dir().expect("current dir");
        let session = Session::with_id("/snapshots", "1-0");
        let path = session.snapshot_path_for(&cwd.join("src").join("main.ts"));
        assert!(file_name(&path).starts_with("src_main.ts."));
    }
}
