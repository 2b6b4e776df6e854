//! Backup-verify-restore harness for mutating files safely.
//!
//! The harness lets a caller apply an arbitrary, possibly destructive change
//! to one or more files while guaranteeing that every file ends up either in
//! its accepted mutated state or byte-for-byte identical to its original:
//!
//! 1. **Snapshot**: the [`BackupStore`] captures each file's bytes into a
//!    session-scoped snapshot directory before anything is touched.
//! 2. **Mutate**: the caller's closure runs exactly once.
//! 3. **Validate**: the [`Validator`] runs a fixed set of independent
//!    [`Check`]s (existence, type check, lint, syntax-only execution check and
//!    corruption heuristics) and merges their findings into a
//!    [`ValidationReport`]. Validation never fails; tool problems become
//!    report entries.
//! 4. **Decide**: [`accepts`] applies the caller's [`ThresholdConfig`]. With a
//!    [`BaselineTolerance`] configured, files are also validated before the
//!    mutation and [`accepts_against`] keeps changes that leave an already
//!    broken file no worse.
//! 5. **Restore or keep**: rejected files are restored from their snapshot.
//!
//! [`OperationRunner`] drives this sequence for a single file and
//! [`BatchCoordinator`] for a set of files changed by one mutation.
//! [`Harness`] bundles a session with a validator and exposes the
//! caller-facing operations.
//!
//! Sessions are independent and are not coordinated with one another: two
//! sessions mutating the same file concurrently race, and each restore only
//! returns the file to that session's own snapshot.

mod backup;
mod batch;
mod checks;
mod error;
mod harness;
mod policy;
mod report;
mod run_report;
mod runner;
mod session;
pub mod telemetry;
pub mod tool;
mod validator;

pub use backup::{BackupEntry, BackupStore};
pub use batch::{BatchCoordinator, BatchOutcome, PathOutcome};
pub use checks::{
    Check, ExecCheck, HeuristicCheck, HeuristicRule, LintCheck, RuleMatcher, Severity, TypeCheck,
    default_rules,
};
pub use error::{HarnessError, MutationError};
pub use harness::Harness;
pub use policy::{BaselineTolerance, ThresholdConfig, accepts, accepts_against};
pub use report::{PartialReport, ValidationReport};
pub use run_report::RunReport;
pub use runner::{OperationOutcome, OperationRunner, OperationState};
pub use session::Session;
pub use validator::{Validator, ValidatorSettings};

#[cfg(test)]
mod test_support;
