//! Default values shared by the harness and the command-line front end.

use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Directory, relative to the working directory, holding session snapshots.
pub const DEFAULT_SNAPSHOT_ROOT: &str = ".warden-snapshots";

/// Seconds an external checker may run before it is killed.
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 120;

/// Default type checker invocation; `{path}` is replaced by the target file.
pub const DEFAULT_TYPE_CHECKER: &str = "npx tsc --noEmit {path}";

/// Default linter invocation; the linter must emit JSON on stdout.
pub const DEFAULT_LINTER: &str = "npx eslint {path} --format json";

/// Default syntax-only check for server endpoint files.
pub const DEFAULT_SYNTAX_CHECKER: &str = "node --check {path}";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default snapshot root directory.
#[must_use]
pub fn default_snapshot_root() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_SNAPSHOT_ROOT)
}
