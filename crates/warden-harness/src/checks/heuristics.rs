//! Pattern rules for corruption signatures left behind by careless edits.

use regex::Regex;

/// How a rule match affects the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Each match counts as a syntax error and invalidates the report.
    Error,
    /// Matches are recorded as a warning only.
    Warning,
}

/// How a rule finds occurrences in file content.
#[derive(Debug, Clone)]
pub enum RuleMatcher {
    /// Every non-overlapping match of the expression is one occurrence.
    Pattern(Regex),
    /// The difference between the counts of two paired markers.
    Unbalanced {
        /// Opening marker.
        open: String,
        /// Closing marker.
        close: String,
    },
}

/// A named, independently testable corruption signature.
#[derive(Debug, Clone)]
pub struct HeuristicRule {
    name: String,
    description: String,
    matcher: RuleMatcher,
    severity: Severity,
    exempt_marker: Option<String>,
}

impl HeuristicRule {
    /// Builds a rule from a regular expression.
    ///
    /// # Errors
    ///
    /// Returns the compilation error when `pattern` is not a valid expression.
    pub fn pattern(
        name: impl Into<String>,
        description: impl Into<String>,
        pattern: &str,
        severity: Severity,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            description: description.into(),
            matcher: RuleMatcher::Pattern(Regex::new(pattern)?),
            severity,
            exempt_marker: None,
        })
    }

    /// Builds a rule counting unmatched paired markers.
    #[must_use]
    pub fn unbalanced(
        name: impl Into<String>,
        description: impl Into<String>,
        open: impl Into<String>,
        close: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            matcher: RuleMatcher::Unbalanced {
                open: open.into(),
                close: close.into(),
            },
            severity,
            exempt_marker: None,
        }
    }

    /// Skips files containing `marker`.
    #[must_use]
    pub fn unless_present(mut self, marker: impl Into<String>) -> Self {
        self.exempt_marker = Some(marker.into());
        self
    }

    /// Short identifier used in report messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description of the signature.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// How matches affect the report.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Matching strategy.
    #[must_use]
    pub const fn matcher(&self) -> &RuleMatcher {
        &self.matcher
    }

    /// Marker whose presence exempts a file from this rule.
    #[must_use]
    pub fn exempt_marker(&self) -> Option<&str> {
        self.exempt_marker.as_deref()
    }

    /// Number of occurrences of this signature in `content`.
    ///
    /// Exempt files always count zero.
    #[must_use]
    pub fn count(&self, content: &str) -> u32 {
        if self
            .exempt_marker
            .as_deref()
            .is_some_and(|marker| content.contains(marker))
        {
            return 0;
        }
        let occurrences = match &self.matcher {
            RuleMatcher::Pattern(regex) => regex.find_iter(content).count(),
            RuleMatcher::Unbalanced { open, close } => content
                .matches(open.as_str())
                .count()
                .abs_diff(content.matches(close.as_str()).count()),
        };
        u32::try_from(occurrences).unwrap_or(u32::MAX)
    }
}

/// The built-in corruption signatures.
#[must_use]
pub fn default_rules() -> Vec<HeuristicRule> {
    vec![
        HeuristicRule::unbalanced(
            "unbalanced-fragment",
            "unmatched opening or closing JSX fragment",
            "<>",
            "</>",
            Severity::Error,
        )
        .unless_present("React.Fragment"),
        builtin(
            "broken-method-chain",
            "method chain interrupted by a statement terminator",
            r"\.\s*;\s*\.",
        ),
        builtin(
            "broken-ternary",
            "ternary operator interrupted by a statement terminator",
            r"\?\s*;|;\s*:",
        ),
        builtin(
            "stray-terminator",
            "statement terminator repeated on its own line",
            r";[ \t]*\r?\n\s*;",
        ),
    ]
}

#[expect(
    clippy::expect_used,
    reason = "built-in patterns are literals covered by unit tests"
)]
fn builtin(name: &str, description: &str, pattern: &str) -> HeuristicRule {
    HeuristicRule::pattern(name, description, pattern, Severity::Error)
        .expect("built-in heuristic pattern must compile")
}
