//! End-to-end checks of the public harness API against real files.

use std::fs;
use std::path::PathBuf;

use rstest::{fixture, rstest};
use tempfile::TempDir;
use warden_harness::tool::ProcessToolRunner;
use warden_harness::{
    Check, Harness, HarnessError, HeuristicCheck, OperationState, Session, ThresholdConfig,
    Validator,
};

struct Project {
    dir: TempDir,
}

impl Project {
    fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("write source");
        path
    }

    fn harness(&self) -> Harness {
        let session = Session::new(self.dir.path().join(".warden-snapshots"));
        let checks = vec![Check::Existence, Check::Heuristic(HeuristicCheck::default())];
        Harness::new(session, Validator::new(checks, ProcessToolRunner))
    }
}

#[fixture]
fn project() -> Project {
    Project {
        dir: TempDir::new().expect("create temp dir"),
    }
}

#[rstest]
fn stray_terminators_are_rolled_back_under_default_thresholds(project: Project) {
    let path = project.file("config.ts", "const x = 1;");
    let mut harness = project.harness();

    let outcome = harness
        .safe_file_operation(
            &path,
            || Ok(fs::write(&path, "const x = 1\n;\n;")?),
            &ThresholdConfig::default(),
        )
        .expect("operation completes");

    assert!(!outcome.success());
    assert_eq!(outcome.final_state(), OperationState::RolledBack);
    assert_eq!(fs::read_to_string(&path).expect("read"), "const x = 1;");

    harness.cleanup();
    assert!(matches!(
        harness.restore_backup(&path),
        Err(HarnessError::NoBackup { .. })
    ));
}

#[rstest]
fn sessions_keep_separate_snapshot_directories(project: Project) {
    let first = project.harness();
    let second = project.harness();

    assert_ne!(first.session().id(), second.session().id());
    assert_ne!(first.session().directory(), second.session().directory());
}
