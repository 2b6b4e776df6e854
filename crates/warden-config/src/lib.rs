//! Shared configuration for the Warden harness and its command-line front end.
//!
//! Values are layered by `ortho_config`: built-in defaults are overridden by
//! a configuration file, then by `WARDEN_*` environment variables, and finally
//! by command-line flags. Every field is optional so that an absent layer never
//! masks a lower one; the accessors on [`Config`] resolve the defaults declared
//! in [`defaults`].

pub mod defaults;
mod logging;

use camino::{Utf8Path, Utf8PathBuf};
pub use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use logging::{LogFormat, LogFormatParseError};
pub use ortho_config::OrthoError;

use defaults::{
    DEFAULT_LINTER, DEFAULT_SYNTAX_CHECKER, DEFAULT_TOOL_TIMEOUT_SECS, DEFAULT_TYPE_CHECKER,
    default_log_filter, default_log_format,
};

/// Command-line flags understood by the configuration loader.
///
/// Front ends use this list to separate configuration flags from their own
/// command tokens before handing the former to [`Config`].
pub const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--log-filter",
    "--log-format",
    "--snapshot-root",
    "--tool-timeout-secs",
    "--max-syntax-errors",
    "--max-build-errors",
    "--max-error-increase",
    "--report-dir",
    "--type-checker",
    "--linter",
    "--syntax-checker",
];

/// Layered runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "WARDEN")]
pub struct Config {
    /// `tracing` filter expression, for example `info` or `warden_harness=debug`.
    pub log_filter: Option<String>,
    /// Log output format.
    pub log_format: Option<LogFormat>,
    /// Directory under which per-session snapshot directories are created.
    pub snapshot_root: Option<Utf8PathBuf>,
    /// Seconds an external checker may run before it is killed.
    pub tool_timeout_secs: Option<u64>,
    /// Syntax errors tolerated before a mutation is rolled back.
    pub max_syntax_errors: Option<u32>,
    /// Build errors tolerated before a mutation is rolled back.
    pub max_build_errors: Option<u32>,
    /// Errors a mutation may add relative to the file's state before it ran.
    /// Setting this validates files before mutating them.
    pub max_error_increase: Option<u32>,
    /// Directory receiving a JSON run report per batch.
    pub report_dir: Option<Utf8PathBuf>,
    /// Type checker command line; `{path}` is replaced by the target file.
    pub type_checker: Option<String>,
    /// Linter command line; must print JSON results on stdout.
    pub linter: Option<String>,
    /// Syntax-only checker command line for server endpoint files.
    pub syntax_checker: Option<String>,
}

impl Config {
    /// Returns the configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(default_log_filter())
    }

    /// Returns the configured log format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or(default_log_format())
    }

    /// Returns the snapshot root, falling back to the working-directory default.
    #[must_use]
    pub fn snapshot_root(&self) -> Utf8PathBuf {
        self.snapshot_root
            .clone()
            .unwrap_or_else(defaults::default_snapshot_root)
    }

    /// Returns the snapshot root if one was configured explicitly.
    #[must_use]
    pub fn explicit_snapshot_root(&self) -> Option<&Utf8Path> {
        self.snapshot_root.as_deref()
    }

    /// Returns the per-tool timeout in seconds.
    #[must_use]
    pub fn tool_timeout_secs(&self) -> u64 {
        self.tool_timeout_secs.unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS)
    }

    /// Returns the tolerated syntax error count.
    #[must_use]
    pub fn max_syntax_errors(&self) -> u32 {
        self.max_syntax_errors.unwrap_or(0)
    }

    /// Returns the tolerated build error count.
    #[must_use]
    pub fn max_build_errors(&self) -> u32 {
        self.max_build_errors.unwrap_or(0)
    }

    /// Returns the tolerated error increase over the pre-mutation baseline,
    /// or `None` when baseline comparison is off.
    #[must_use]
    pub const fn max_error_increase(&self) -> Option<u32> {
        self.max_error_increase
    }

    /// Returns the run report directory if reports are enabled.
    #[must_use]
    pub fn report_dir(&self) -> Option<&Utf8Path> {
        self.report_dir.as_deref()
    }

    /// Returns the type checker command line.
    #[must_use]
    pub fn type_checker(&self) -> &str {
        self.type_checker.as_deref().unwrap_or(DEFAULT_TYPE_CHECKER)
    }

    /// Returns the linter command line.
    #[must_use]
    pub fn linter(&self) -> &str {
        self.linter.as_deref().unwrap_or(DEFAULT_LINTER)
    }

    /// Returns the syntax-only checker command line.
    #[must_use]
    pub fn syntax_checker(&self) -> &str {
        self.syntax_checker
            .as_deref()
            .unwrap_or(DEFAULT_SYNTAX_CHECKER)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn empty_config_resolves_defaults() {
        let config = Config::default();
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.snapshot_root(), Utf8PathBuf::from(".warden-snapshots"));
        assert!(config.explicit_snapshot_root().is_none());
        assert_eq!(config.tool_timeout_secs(), 120);
        assert_eq!(config.max_syntax_errors(), 0);
        assert_eq!(config.max_build_errors(), 0);
        assert_eq!(config.max_error_increase(), None);
        assert!(config.report_dir().is_none());
        assert_eq!(config.type_checker(), "npx tsc --noEmit {path}");
    }

    #[rstest]
    fn explicit_values_win_over_defaults() {
        let config = Config {
            log_filter: Some(String::from("debug")),
            log_format: Some(LogFormat::Compact),
            max_syntax_errors: Some(3),
            linter: Some(String::from("eslint --format json {path}")),
            ..Config::default()
        };
        assert_eq!(config.log_filter(), "debug");
        assert_eq!(config.log_format(), LogFormat::Compact);
        assert_eq!(config.max_syntax_errors(), 3);
        assert_eq!(config.linter(), "eslint --format json {path}");
    }

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case("COMPACT", LogFormat::Compact)]
    fn log_format_parses_case_insensitively(#[case] text: &str, #[case] expected: LogFormat) {
        let parsed: LogFormat = text.parse().expect("parse log format");
        assert_eq!(parsed, expected);
    }

    #[rstest]
    fn log_format_rejects_unknown_values() {
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
