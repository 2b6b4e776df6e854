//! Accept/reject decision for validation reports.

use serde::{Deserialize, Serialize};
use warden_config::Config;

use crate::report::ValidationReport;

/// Regression a caller tolerates relative to a file's state before the
/// mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BaselineTolerance {
    /// Additional syntax and build errors, combined, accepted over the
    /// baseline. Zero rolls back on any increase.
    pub max_error_increase: u32,
}

impl BaselineTolerance {
    /// Creates a tolerance allowing `max_error_increase` new errors.
    #[must_use]
    pub const fn new(max_error_increase: u32) -> Self {
        Self { max_error_increase }
    }
}

/// Error counts a caller tolerates before a mutation is rolled back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ThresholdConfig {
    /// Maximum syntax errors accepted.
    pub max_syntax_errors: u32,
    /// Maximum build errors accepted.
    pub max_build_errors: u32,
    /// When set, files are validated before the mutation too, and a
    /// mutation that does not make a file worse is accepted even when the
    /// file was already broken.
    pub baseline: Option<BaselineTolerance>,
}

impl ThresholdConfig {
    /// Creates a threshold configuration without baseline comparison.
    #[must_use]
    pub const fn new(max_syntax_errors: u32, max_build_errors: u32) -> Self {
        Self {
            max_syntax_errors,
            max_build_errors,
            baseline: None,
        }
    }

    /// Enables baseline comparison with `tolerance`.
    #[must_use]
    pub const fn with_baseline(mut self, tolerance: BaselineTolerance) -> Self {
        self.baseline = Some(tolerance);
        self
    }

    /// Thresholds configured in the layered configuration.
    ///
    /// Setting `max_error_increase` turns on baseline comparison.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            baseline: config.max_error_increase().map(BaselineTolerance::new),
            ..Self::new(config.max_syntax_errors(), config.max_build_errors())
        }
    }

    /// Returns true when files must be validated before they are mutated.
    #[must_use]
    pub const fn compares_to_baseline(&self) -> bool {
        self.baseline.is_some()
    }
}

/// Returns true when `report` is acceptable under `thresholds`.
///
/// A report is rejected when any check recorded an error or when either
/// count exceeds its maximum. Counts equal to the maximum are accepted.
#[must_use]
pub const fn accepts(report: &ValidationReport, thresholds: &ThresholdConfig) -> bool {
    report.is_valid()
        && report.syntax_errors() <= thresholds.max_syntax_errors
        && report.build_errors() <= thresholds.max_build_errors
}

/// Returns true when `current` is acceptable given the `baseline` report
/// taken before the mutation.
///
/// A report that [`accepts`] on its own is always acceptable. Otherwise, with
/// a baseline tolerance configured, the mutation is kept when validation ran
/// to completion, no check fails that passed on the baseline, and the
/// combined syntax and build error count grew by no more than the tolerance.
#[must_use]
pub fn accepts_against(
    baseline: &ValidationReport,
    current: &ValidationReport,
    thresholds: &ThresholdConfig,
) -> bool {
    if accepts(current, thresholds) {
        return true;
    }
    let Some(tolerance) = thresholds.baseline else {
        return false;
    };
    if current.halted() {
        return false;
    }

    let new_failure = current
        .failed_checks()
        .iter()
        .any(|check| !baseline.failed_checks().contains(check));
    let increase = error_total(current).saturating_sub(error_total(baseline));
    !new_failure && increase <= u64::from(tolerance.max_error_increase)
}

fn error_total(report: &ValidationReport) -> u64 {
    u64::from(report.syntax_errors()) + u64::from(report.build_errors())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::report::PartialReport;

    /// Report with the given counts that is otherwise valid.
    fn counted(syntax: u32, build: u32) -> ValidationReport {
        let mut partial = PartialReport::new();
        partial.add_syntax_errors(syntax).add_build_errors(build);
        std::iter::once(partial).collect()
    }

    /// Report in which `check` failed with `syntax` syntax errors.
    fn failing(check: &'static str, syntax: u32) -> ValidationReport {
        let mut partial = PartialReport::new();
        partial
            .error(format!("{check} failed"))
            .add_syntax_errors(syntax);
        let mut report = ValidationReport::new();
        report.merge_check(check, partial);
        report
    }

    fn lenient(increase: u32) -> ThresholdConfig {
        ThresholdConfig::default().with_baseline(BaselineTolerance::new(increase))
    }

    #[rstest]
    #[case(0, 0, ThresholdConfig::default(), true)]
    #[case(2, 0, ThresholdConfig::new(2, 0), true)]
    #[case(3, 0, ThresholdConfig::new(2, 0), false)]
    #[case(0, 1, ThresholdConfig::new(5, 1), true)]
    #[case(0, 2, ThresholdConfig::new(5, 1), false)]
    fn counts_are_compared_inclusively(
        #[case] syntax: u32,
        #[case] build: u32,
        #[case] thresholds: ThresholdConfig,
        #[case] expected: bool,
    ) {
        assert_eq!(accepts(&counted(syntax, build), &thresholds), expected);
    }

    #[rstest]
    fn invalid_report_is_rejected_even_with_zero_counts() {
        let mut partial = PartialReport::new();
        partial.error("file is not readable");
        let report: ValidationReport = std::iter::once(partial).collect();

        assert!(!accepts(&report, &ThresholdConfig::new(10, 10)));
    }

    #[rstest]
    #[case(4, 4, 0, true)]
    #[case(4, 2, 0, true)]
    #[case(4, 5, 0, false)]
    #[case(4, 5, 1, true)]
    #[case(4, 7, 2, false)]
    fn baseline_bounds_the_error_increase(
        #[case] before: u32,
        #[case] after: u32,
        #[case] increase: u32,
        #[case] expected: bool,
    ) {
        let baseline = failing("type-check", before);
        let current = failing("type-check", after);

        assert_eq!(
            accepts_against(&baseline, &current, &lenient(increase)),
            expected
        );
    }

    #[rstest]
    fn newly_failing_check_is_rejected_despite_tolerance() {
        let baseline = failing("type-check", 3);
        let mut current = failing("type-check", 2);
        let mut heuristics = PartialReport::new();
        heuristics.error("stray-terminator: 1").add_syntax_errors(1);
        current.merge_check("heuristic", heuristics);

        assert!(!accepts_against(&baseline, &current, &lenient(5)));
    }

    #[rstest]
    fn halted_validation_is_never_accepted_against_a_baseline() {
        let baseline = failing("type-check", 3);
        let mut missing = PartialReport::new();
        missing.error("gone is not readable").halt();
        let mut current = ValidationReport::new();
        current.merge_check("existence", missing);

        assert!(!accepts_against(&baseline, &current, &lenient(10)));
    }

    #[rstest]
    fn without_tolerance_only_absolute_thresholds_apply() {
        let baseline = failing("type-check", 4);
        let current = failing("type-check", 1);

        assert!(!accepts_against(&baseline, &current, &ThresholdConfig::default()));
        assert!(accepts_against(
            &baseline,
            &counted(0, 0),
            &ThresholdConfig::default()
        ));
    }

    #[rstest]
    fn thresholds_follow_configuration() {
        let config = Config {
            max_build_errors: Some(2),
            ..Config::default()
        };
        assert_eq!(ThresholdConfig::from_config(&config), ThresholdConfig::new(0, 2));

        let lenient_config = Config {
            max_error_increase: Some(1),
            ..Config::default()
        };
        let thresholds = ThresholdConfig::from_config(&lenient_config);
        assert!(thresholds.compares_to_baseline());
        assert_eq!(thresholds.baseline, Some(BaselineTolerance::new(1)));
    }
}
