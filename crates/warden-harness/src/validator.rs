//! Runs the configured checks against a file and merges their findings.

use std::path::Path;
use std::time::Duration;

use tracing::info;
use warden_config::Config;
use warden_config::defaults::{
    DEFAULT_LINTER, DEFAULT_SYNTAX_CHECKER, DEFAULT_TOOL_TIMEOUT_SECS, DEFAULT_TYPE_CHECKER,
};

use crate::checks::{Check, ExecCheck, HeuristicCheck, LintCheck, TypeCheck};
use crate::report::ValidationReport;
use crate::tool::{ProcessToolRunner, ToolRunner};

/// Tracing target for validation.
const VALIDATOR_TARGET: &str = "warden_harness::validator";

/// Marker identifying a type checker diagnostic line.
const TYPE_ERROR_MARKER: &str = "error TS";

/// Directory name marking server endpoint files.
const ENDPOINT_DIR: &str = "api";

const TYPED_EXTENSIONS: &[&str] = &["ts", "tsx"];
const LINTED_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx"];

/// Settings describing which tools the default check set invokes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorSettings {
    /// Type checker command line.
    pub type_checker: String,
    /// Linter command line.
    pub linter: String,
    /// Syntax-only checker command line.
    pub syntax_checker: String,
    /// Per-invocation timeout for every tool.
    pub tool_timeout: Duration,
}

impl ValidatorSettings {
    /// Resolves settings from layered configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            type_checker: config.type_checker().to_owned(),
            linter: config.linter().to_owned(),
            syntax_checker: config.syntax_checker().to_owned(),
            tool_timeout: Duration::from_secs(config.tool_timeout_secs()),
        }
    }

    /// Builds the standard check sequence from these settings.
    #[must_use]
    pub fn checks(&self) -> Vec<Check> {
        let owned = |list: &[&str]| list.iter().map(|ext| (*ext).to_owned()).collect();
        vec![
            Check::Existence,
            Check::TypeCheck(TypeCheck::new(
                self.type_checker.as_str(),
                owned(TYPED_EXTENSIONS),
                TYPE_ERROR_MARKER,
                self.tool_timeout,
            )),
            Check::Lint(LintCheck::new(
                self.linter.as_str(),
                owned(LINTED_EXTENSIONS),
                self.tool_timeout,
            )),
            Check::Exec(ExecCheck::new(
                self.syntax_checker.as_str(),
                ENDPOINT_DIR,
                self.tool_timeout,
            )),
            Check::Heuristic(HeuristicCheck::default()),
        ]
    }
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            type_checker: DEFAULT_TYPE_CHECKER.to_owned(),
            linter: DEFAULT_LINTER.to_owned(),
            syntax_checker: DEFAULT_SYNTAX_CHECKER.to_owned(),
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
        }
    }
}

/// Applies an ordered list of checks to files.
///
/// Checks run in order and their partial reports are merged. A check that
/// halts (only the existence check does) skips the remaining checks, since
/// content-based checks are meaningless for a file that cannot be read.
#[derive(Debug)]
pub struct Validator<R = ProcessToolRunner> {
    checks: Vec<Check>,
    runner: R,
}

impl Validator<ProcessToolRunner> {
    /// Builds the standard check set running real processes.
    #[must_use]
    pub fn from_settings(settings: &ValidatorSettings) -> Self {
        Self::new(settings.checks(), ProcessToolRunner)
    }
}

impl Default for Validator<ProcessToolRunner> {
    fn default() -> Self {
        Self::from_settings(&ValidatorSettings::default())
    }
}

impl<R: ToolRunner> Validator<R> {
    /// Creates a validator from explicit checks and a tool runner.
    #[must_use]
    pub const fn new(checks: Vec<Check>, runner: R) -> Self {
        Self { checks, runner }
    }

    /// Builds the standard check set with a custom tool runner.
    #[must_use]
    pub fn with_runner(settings: &ValidatorSettings, runner: R) -> Self {
        Self::new(settings.checks(), runner)
    }

    /// Checks applied by this validator, in order.
    #[must_use]
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Validates `path`.
    ///
    /// Validation never fails: unreadable files and checker tools that cannot
    /// run are recorded in the returned report.
    #[must_use]
    pub fn validate(&self, path: &Path) -> ValidationReport {
        let mut report = ValidationReport::new();
        for check in &self.checks {
            let partial = check.run(path, &self.runner);
            let halts = partial.halts();
            report.merge_check(check.name(), partial);
            if halts {
                break;
            }
        }

        info!(
            target: VALIDATOR_TARGET,
            path = %path.display(),
            is_valid = report.is_valid(),
            syntax_errors = report.syntax_errors(),
            build_errors = report.build_errors(),
            warnings = report.warnings().len(),
            "validation finished"
        );
        report
    }
}
