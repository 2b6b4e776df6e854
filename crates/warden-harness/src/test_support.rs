//! Shared fixtures and test doubles for unit tests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

use crate::backup::BackupStore;
use crate::checks::{Check, ExecCheck, HeuristicCheck, LintCheck, TypeCheck};
use crate::session::Session;
use crate::tool::{ToolError, ToolInvocation, ToolOutput, ToolRunner};
use crate::validator::Validator;

/// Programs used by [`tool_checks`].
pub(crate) const TYPE_CHECKER: &str = "tsc";
pub(crate) const LINTER: &str = "eslint";
pub(crate) const SYNTAX_CHECKER: &str = "node";

/// Scratch directory holding files under test and a fixed-id session.
pub(crate) struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub(crate) fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    /// Absolute path for `name` inside the workspace.
    pub(crate) fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Writes `content` to `name`, creating parent directories.
    pub(crate) fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, content).expect("write fixture file");
        path
    }

    pub(crate) fn read(&self, path: &Path) -> String {
        fs::read_to_string(path).expect("read file")
    }

    pub(crate) fn session(&self) -> Session {
        Session::with_id(self.dir.path().join("snapshots"), "test-session")
    }

    pub(crate) fn session_dir(&self) -> PathBuf {
        self.session().directory().to_path_buf()
    }

    pub(crate) fn store(&self) -> BackupStore {
        BackupStore::new(self.session())
    }
}

/// Tool runner that answers from a table keyed by program name.
///
/// Programs without an entry exit cleanly with an empty JSON array on stdout.
#[derive(Debug, Default, Clone)]
pub(crate) struct ConfigurableToolRunner {
    responses: HashMap<String, Result<ToolOutput, ToolError>>,
}

impl ConfigurableToolRunner {
    /// Every tool passes.
    pub(crate) fn passing() -> Self {
        Self::default()
    }

    /// `program` produces `output`.
    pub(crate) fn responding(mut self, program: &str, output: ToolOutput) -> Self {
        self.responses.insert(program.to_owned(), Ok(output));
        self
    }

    /// `program` cannot be run.
    pub(crate) fn failing(mut self, program: &str, error: ToolError) -> Self {
        self.responses.insert(program.to_owned(), Err(error));
        self
    }
}

impl ToolRunner for ConfigurableToolRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        self.responses
            .get(invocation.program())
            .cloned()
            .unwrap_or_else(|| Ok(ToolOutput::new(Some(0), "[]", "")))
    }
}

/// The full check set wired to the short program names above.
pub(crate) fn tool_checks() -> Vec<Check> {
    let timeout = Duration::from_secs(5);
    let extensions = |list: &[&str]| list.iter().map(|ext| (*ext).to_owned()).collect();
    vec![
        Check::Existence,
        Check::TypeCheck(TypeCheck::new(
            "tsc --noEmit {path}",
            extensions(&["ts", "tsx"]),
            "error TS",
            timeout,
        )),
        Check::Lint(LintCheck::new(
            "eslint {path} --format json",
            extensions(&["js", "jsx", "mjs", "cjs", "ts", "tsx"]),
            timeout,
        )),
        Check::Exec(ExecCheck::new("node --check {path}", "api", timeout)),
        Check::Heuristic(HeuristicCheck::default()),
    ]
}

/// Validator over [`tool_checks`] using `runner`.
pub(crate) fn validator(runner: ConfigurableToolRunner) -> Validator<ConfigurableToolRunner> {
    Validator::new(tool_checks(), runner)
}

/// Type checker output reporting `count` errors for `file`.
pub(crate) fn type_errors(file: &str, count: usize) -> ToolOutput {
    let stdout: String = (1..=count)
        .map(|line| format!("{file}({line},1): error TS1005: ';' expected.\n"))
        .collect();
    ToolOutput::new(Some(2), stdout, "")
}
