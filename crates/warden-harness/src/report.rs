//! Validation report types.

use serde::Serialize;

/// Findings produced by a single check.
///
/// A check marks the partial report invalid whenever it records an error;
/// warnings never affect validity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialReport {
    invalid: bool,
    halt: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
    syntax_errors: u32,
    build_errors: u32,
}

impl PartialReport {
    /// Creates a clean partial report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error and marks the report invalid.
    pub fn error(&mut self, message: impl Into<String>) -> &mut Self {
        self.invalid = true;
        self.errors.push(message.into());
        self
    }

    /// Records a warning.
    pub fn warning(&mut self, message: impl Into<String>) -> &mut Self {
        self.warnings.push(message.into());
        self
    }

    /// Adds to the syntax error count.
    pub fn add_syntax_errors(&mut self, count: u32) -> &mut Self {
        self.syntax_errors = self.syntax_errors.saturating_add(count);
        self
    }

    /// Adds to the build error count.
    pub fn add_build_errors(&mut self, count: u32) -> &mut Self {
        self.build_errors = self.build_errors.saturating_add(count);
        self
    }

    /// Stops the remaining checks from running.
    pub fn halt(&mut self) -> &mut Self {
        self.halt = true;
        self
    }

    /// Returns true when no error was recorded.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !self.invalid
    }

    /// Returns true when later checks must be skipped.
    #[must_use]
    pub const fn halts(&self) -> bool {
        self.halt
    }

    /// Recorded error messages.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Recorded warning messages.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Syntax errors found by this check.
    #[must_use]
    pub const fn syntax_errors(&self) -> u32 {
        self.syntax_errors
    }

    /// Build errors found by this check.
    #[must_use]
    pub const fn build_errors(&self) -> u32 {
        self.build_errors
    }
}

/// Merged result of one validation pass over a file.
///
/// `is_valid` is false whenever any check recorded an error, regardless of
/// the numeric counts, which refine the boolean for threshold decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    is_valid: bool,
    halted: bool,
    failed_checks: Vec<&'static str>,
    errors: Vec<String>,
    warnings: Vec<String>,
    syntax_errors: u32,
    build_errors: u32,
}

impl ValidationReport {
    /// Creates a valid report with no findings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            is_valid: true,
            halted: false,
            failed_checks: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            syntax_errors: 0,
            build_errors: 0,
        }
    }

    /// Folds one check's findings into the report, preserving order.
    pub fn merge(&mut self, partial: PartialReport) {
        self.is_valid &= partial.is_valid();
        self.halted |= partial.halts();
        self.errors.extend(partial.errors);
        self.warnings.extend(partial.warnings);
        self.syntax_errors = self.syntax_errors.saturating_add(partial.syntax_errors);
        self.build_errors = self.build_errors.saturating_add(partial.build_errors);
    }

    /// Folds the findings of the check named `check` into the report and
    /// remembers the check when it recorded an error.
    pub fn merge_check(&mut self, check: &'static str, partial: PartialReport) {
        if !partial.is_valid() && !self.failed_checks.contains(&check) {
            self.failed_checks.push(check);
        }
        self.merge(partial);
    }

    /// Returns true when no check recorded an error.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Names of the checks that recorded an error, in the order they ran.
    #[must_use]
    pub fn failed_checks(&self) -> &[&'static str] {
        &self.failed_checks
    }

    /// Returns true when a check stopped validation early, so the counts
    /// do not describe the file's content.
    #[must_use]
    pub const fn halted(&self) -> bool {
        self.halted
    }

    /// Error messages in the order the checks produced them.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Warning messages in the order the checks produced them.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Total syntax errors.
    #[must_use]
    pub const fn syntax_errors(&self) -> u32 {
        self.syntax_errors
    }

    /// Total build errors.
    #[must_use]
    pub const fn build_errors(&self) -> u32 {
        self.build_errors
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<PartialReport> for ValidationReport {
    fn from_iter<I: IntoIterator<Item = PartialReport>>(iter: I) -> Self {
        let mut report = Self::new();
        for partial in iter {
            report.merge(partial);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_valid() {
        let report = ValidationReport::new();
        assert!(report.is_valid());
        assert!(report.errors().is_empty());
        assert_eq!(report.syntax_errors(), 0);
    }

    #[test]
    fn merge_unions_findings_in_order() {
        let mut lint = PartialReport::new();
        lint.warning("lint warnings: 2");
        let mut heuristics = PartialReport::new();
        heuristics.error("broken-ternary: 1 match").add_syntax_errors(1);
        let mut exec = PartialReport::new();
        exec.error("syntax check failed").add_build_errors(1);

        let report: ValidationReport = [lint, heuristics, exec].into_iter().collect();

        assert!(!report.is_valid());
        assert_eq!(
            report.errors(),
            ["broken-ternary: 1 match", "syntax check failed"]
        );
        assert_eq!(report.warnings(), ["lint warnings: 2"]);
        assert_eq!(report.syntax_errors(), 1);
        assert_eq!(report.build_errors(), 1);
    }

    #[test]
    fn warnings_alone_keep_report_valid() {
        let mut partial = PartialReport::new();
        partial.warning("tool unavailable");
        let mut report = ValidationReport::new();
        report.merge(partial);
        assert!(report.is_valid());
    }

    #[test]
    fn error_without_counts_still_invalidates() {
        let mut partial = PartialReport::new();
        partial.error("file is not readable").halt();
        assert!(partial.halts());
        let mut report = ValidationReport::new();
        report.merge(partial);
        assert!(!report.is_valid());
        assert!(report.halted());
        assert_eq!(report.syntax_errors(), 0);
        assert_eq!(report.build_errors(), 0);
    }

    #[test]
    fn failing_checks_are_named_once() {
        let mut report = ValidationReport::new();
        let mut lint = PartialReport::new();
        lint.warning("lint warnings: 1");
        report.merge_check("lint", lint);
        for _ in 0..2 {
            let mut heuristics = PartialReport::new();
            heuristics.error("stray-terminator: 1").add_syntax_errors(1);
            report.merge_check("heuristic", heuristics);
        }

        assert_eq!(report.failed_checks(), ["heuristic"]);
        assert_eq!(report.syntax_errors(), 2);
    }

    #[test]
    fn report_serialises_with_snake_case_fields() {
        let report = ValidationReport::new();
        let json = serde_json::to_value(&report).expect("serialise");
        assert_eq!(json["is_valid"], serde_json::Value::Bool(true));
        assert_eq!(json["syntax_errors"], serde_json::json!(0));
    }
}
