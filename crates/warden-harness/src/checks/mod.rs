//! The closed set of validation checks.
//!
//! Each [`Check`] variant inspects one aspect of a mutated file and returns a
//! [`PartialReport`]. Checks never fail: a checker tool that cannot run is
//! itself a finding. The validator merges partial reports without knowing
//! which variant produced them.

mod heuristics;

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

pub use heuristics::{HeuristicRule, RuleMatcher, Severity, default_rules};

use crate::report::PartialReport;
use crate::tool::{ToolError, ToolInvocation, ToolOutput, ToolRunner};

/// Tracing target for check execution.
const CHECK_TARGET: &str = "warden_harness::checks";

/// One validation strategy.
#[derive(Debug, Clone)]
pub enum Check {
    /// The file must exist and be readable; failure halts later checks.
    Existence,
    /// Static type checking for typed sources.
    TypeCheck(TypeCheck),
    /// Structured lint results.
    Lint(LintCheck),
    /// Syntax-only execution check for server endpoints.
    Exec(ExecCheck),
    /// Pattern rules for known corruption signatures.
    Heuristic(HeuristicCheck),
}

impl Check {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Existence => "existence",
            Self::TypeCheck(_) => "type-check",
            Self::Lint(_) => "lint",
            Self::Exec(_) => "exec",
            Self::Heuristic(_) => "heuristic",
        }
    }

    /// Runs the check against `path`.
    pub fn run(&self, path: &Path, runner: &dyn ToolRunner) -> PartialReport {
        debug!(target: CHECK_TARGET, check = self.name(), path = %path.display(), "running check");
        match self {
            Self::Existence => check_existence(path),
            Self::TypeCheck(check) => check.run(path, runner),
            Self::Lint(check) => check.run(path, runner),
            Self::Exec(check) => check.run(path, runner),
            Self::Heuristic(check) => check.run(path),
        }
    }
}

fn check_existence(path: &Path) -> PartialReport {
    let mut report = PartialReport::new();
    match fs::File::open(path).and_then(|file| file.metadata()) {
        Ok(metadata) if metadata.is_file() => {}
        Ok(_) => {
            report
                .error(format!("{} is not a regular file", path.display()))
                .halt();
        }
        Err(error) => {
            report
                .error(format!("{} is not readable: {error}", path.display()))
                .halt();
        }
    }
    report
}

/// Returns true when `path` has one of `extensions`, compared case-insensitively.
fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            extensions
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(extension))
        })
}

/// Runs a configured command line against `path`.
fn invoke(
    command_line: &str,
    path: &Path,
    timeout: Duration,
    runner: &dyn ToolRunner,
) -> Result<ToolOutput, ToolError> {
    let invocation = ToolInvocation::from_command_line(command_line, path, timeout).ok_or_else(
        || ToolError::NotFound {
            program: String::from("<empty command>"),
        },
    )?;
    runner.run(&invocation).inspect_err(|error| {
        warn!(
            target: CHECK_TARGET,
            path = %path.display(),
            %error,
            "checker could not run"
        );
    })
}

/// Type checker invocation for statically typed sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCheck {
    command: String,
    extensions: Vec<String>,
    error_marker: String,
    timeout: Duration,
}

impl TypeCheck {
    /// Creates a type check.
    #[must_use]
    pub fn new(
        command: impl Into<String>,
        extensions: Vec<String>,
        error_marker: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            extensions,
            error_marker: error_marker.into(),
            timeout,
        }
    }

    fn run(&self, path: &Path, runner: &dyn ToolRunner) -> PartialReport {
        let mut report = PartialReport::new();
        if !has_extension(path, &self.extensions) {
            return report;
        }

        match invoke(&self.command, path, self.timeout, runner) {
            Ok(output) => {
                let marked = output
                    .lines()
                    .filter(|line| line.contains(self.error_marker.as_str()))
                    .count();
                let count = u32::try_from(marked).unwrap_or(u32::MAX);
                if count > 0 {
                    report
                        .error(format!("type errors: {count}"))
                        .add_syntax_errors(count);
                } else if !output.success() {
                    report
                        .error(format!(
                            "type checker exited with status {} without diagnostics",
                            describe_status(&output)
                        ))
                        .add_syntax_errors(1);
                }
            }
            Err(error) => {
                report
                    .error(format!("type check failed: {error}"))
                    .add_syntax_errors(1);
            }
        }
        report
    }
}

/// Per-file entry in a linter's JSON output.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LintFileResult {
    #[serde(default)]
    error_count: u32,
    #[serde(default)]
    warning_count: u32,
}

/// Linter invocation with JSON output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintCheck {
    command: String,
    extensions: Vec<String>,
    timeout: Duration,
}

impl LintCheck {
    /// Creates a lint check.
    #[must_use]
    pub fn new(command: impl Into<String>, extensions: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            extensions,
            timeout,
        }
    }

    fn run(&self, path: &Path, runner: &dyn ToolRunner) -> PartialReport {
        let mut report = PartialReport::new();
        if !has_extension(path, &self.extensions) {
            return report;
        }

        let output = match invoke(&self.command, path, self.timeout, runner) {
            Ok(output) => output,
            Err(error) => {
                report.warning(format!("lint check failed: {error}"));
                return report;
            }
        };

        match serde_json::from_str::<Vec<LintFileResult>>(output.stdout().trim()) {
            Ok(results) => {
                let (errors, warnings) = results.iter().fold((0u32, 0u32), |(e, w), file| {
                    (
                        e.saturating_add(file.error_count),
                        w.saturating_add(file.warning_count),
                    )
                });
                if errors > 0 {
                    report.error(format!("lint errors: {errors}"));
                }
                if warnings > 0 {
                    report.warning(format!("lint warnings: {warnings}"));
                }
            }
            Err(error) => {
                report.warning(format!(
                    "lint check failed: unreadable output (status {}): {error}",
                    describe_status(&output)
                ));
            }
        }
        report
    }
}

/// Syntax-only check for files under an endpoint directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCheck {
    command: String,
    endpoint_dir: String,
    timeout: Duration,
}

impl ExecCheck {
    /// Creates an execution check for files below a directory named
    /// `endpoint_dir`.
    #[must_use]
    pub fn new(command: impl Into<String>, endpoint_dir: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            endpoint_dir: endpoint_dir.into(),
            timeout,
        }
    }

    /// Returns true when `path` lies below an endpoint directory.
    #[must_use]
    pub fn applies_to(&self, path: &Path) -> bool {
        path.parent().is_some_and(|parent| {
            parent
                .components()
                .any(|component| component.as_os_str() == self.endpoint_dir.as_str())
        })
    }

    fn run(&self, path: &Path, runner: &dyn ToolRunner) -> PartialReport {
        let mut report = PartialReport::new();
        if !self.applies_to(path) {
            return report;
        }

        match invoke(&self.command, path, self.timeout, runner) {
            Ok(output) if output.success() => {}
            Ok(output) => {
                let detail = output.stderr().lines().next().unwrap_or_default();
                report
                    .error(format!(
                        "syntax check failed with status {}: {detail}",
                        describe_status(&output)
                    ))
                    .add_build_errors(1);
            }
            Err(error) => {
                report
                    .error(format!("syntax check failed: {error}"))
                    .add_build_errors(1);
            }
        }
        report
    }
}

/// Named pattern rules applied to the file content.
#[derive(Debug, Clone)]
pub struct HeuristicCheck {
    rules: Vec<HeuristicRule>,
}

impl HeuristicCheck {
    /// Creates a heuristic check with explicit rules.
    #[must_use]
    pub const fn new(rules: Vec<HeuristicRule>) -> Self {
        Self { rules }
    }

    /// Rules applied by this check.
    #[must_use]
    pub fn rules(&self) -> &[HeuristicRule] {
        &self.rules
    }

    fn run(&self, path: &Path) -> PartialReport {
        let mut report = PartialReport::new();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(error) => {
                report.error(format!("heuristic check could not read file: {error}"));
                return report;
            }
        };
        let content = String::from_utf8_lossy(&bytes);

        for rule in &self.rules {
            let count = rule.count(&content);
            if count == 0 {
                continue;
            }
            let message = format!("{}: {} ({count} found)", rule.name(), rule.description());
            match rule.severity() {
                Severity::Error => {
                    report.error(message).add_syntax_errors(count);
                }
                Severity::Warning => {
                    report.warning(message);
                }
            }
        }
        report
    }
}

impl Default for HeuristicCheck {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

fn describe_status(output: &ToolOutput) -> String {
    output
        .status()
        .map_or_else(|| String::from("signal"), |code| code.to_string())
}
