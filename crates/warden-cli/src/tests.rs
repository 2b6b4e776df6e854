//! Unit tests for the CLI runtime.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

struct StaticConfigLoader {
    config: Config,
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

struct FailingLoader;

impl ConfigLoader for FailingLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Err(AppError::Write(std::io::Error::other("config file unreadable")))
    }
}

struct TestWorld {
    dir: TempDir,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl TestWorld {
    fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("write fixture");
        path
    }

    fn config(&self) -> Config {
        let root = self.dir.path().join("snapshots");
        Config {
            snapshot_root: Some(Utf8PathBuf::from_path_buf(root).expect("utf-8 temp path")),
            ..Config::default()
        }
    }

    fn run(&mut self, args: &[&str]) -> ExitCode {
        let loader = StaticConfigLoader {
            config: self.config(),
        };
        self.run_with(args, &loader)
    }

    fn run_with<L: ConfigLoader>(&mut self, args: &[&str], loader: &L) -> ExitCode {
        self.stdout.clear();
        self.stderr.clear();
        let arguments = std::iter::once("warden")
            .chain(args.iter().copied())
            .map(OsString::from);
        run_with_loader(arguments, &mut self.stdout, &mut self.stderr, loader)
    }

    fn stdout(&self) -> String {
        String::from_utf8(self.stdout.clone()).expect("stdout utf8")
    }

    fn stderr(&self) -> String {
        String::from_utf8(self.stderr.clone()).expect("stderr utf8")
    }

    fn json_lines(&self) -> Vec<serde_json::Value> {
        self.stdout()
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect()
    }
}

#[fixture]
fn world() -> TestWorld {
    TestWorld {
        dir: TempDir::new().expect("create temp dir"),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

fn text(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

#[rstest]
fn validate_accepts_clean_files(mut world: TestWorld) {
    let path = world.file("notes.md", "plain text\n");

    let exit = world.run(&["validate", text(&path)]);

    assert_eq!(exit, ExitCode::SUCCESS);
    let lines = world.json_lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["accepted"], true);
    assert_eq!(lines[0]["report"]["is_valid"], true);
}

#[rstest]
fn validate_rejects_corrupted_and_missing_files(mut world: TestWorld) {
    let broken = world.file("broken.md", "const x = 1\n;\n;");
    let missing = world.dir.path().join("missing.md");

    let exit = world.run(&["validate", text(&broken), text(&missing)]);

    assert_eq!(exit, ExitCode::FAILURE);
    let lines = world.json_lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["accepted"], false);
    assert_eq!(lines[0]["report"]["syntax_errors"], 1);
    assert_eq!(lines[1]["report"]["is_valid"], false);
}

#[rstest]
fn missing_subcommand_is_a_usage_error(mut world: TestWorld) {
    let exit = world.run(&[]);

    assert_eq!(exit, ExitCode::FAILURE);
    assert!(world.stderr().contains("Usage"));
}

#[rstest]
fn help_is_written_to_stdout(mut world: TestWorld) {
    let exit = world.run(&["--help"]);

    assert_eq!(exit, ExitCode::SUCCESS);
    assert!(world.stdout().contains("validate"));
    assert!(world.stdout().contains("guard"));
}

#[rstest]
fn configuration_failures_are_reported(mut world: TestWorld) {
    let path = world.file("notes.md", "ok");

    let exit = world.run_with(&["validate", text(&path)], &FailingLoader);

    assert_eq!(exit, ExitCode::FAILURE);
    assert!(world.stderr().contains("config file unreadable"));
}

#[cfg(unix)]
mod guard {
    use super::*;

    const OVERWRITE: &str = "printf \"$2\" > \"$1\"";

    #[rstest]
    fn accepted_command_changes_are_kept(mut world: TestWorld) {
        let path = world.file("notes.md", "before\n");

        let exit = world.run(&[
            "guard", "--file", text(&path), "--", "sh", "-c", OVERWRITE, "sh", text(&path),
            "after\\n",
        ]);

        assert_eq!(exit, ExitCode::SUCCESS);
        assert_eq!(fs::read_to_string(&path).expect("read"), "after\n");
        assert_eq!(world.json_lines()[0]["success"], true);
        let leftover = fs::read_dir(world.dir.path().join("snapshots"))
            .map(Iterator::count)
            .unwrap_or(0);
        assert_eq!(leftover, 0);
    }

    #[rstest]
    fn corrupting_command_is_rolled_back(mut world: TestWorld) {
        let path = world.file("notes.md", "const x = 1;");

        let exit = world.run(&[
            "guard", "--file", text(&path), "--", "sh", "-c", OVERWRITE, "sh", text(&path),
            "const x = 1\\n;\\n;",
        ]);

        assert_eq!(exit, ExitCode::FAILURE);
        assert_eq!(fs::read_to_string(&path).expect("read"), "const x = 1;");
        let lines = world.json_lines();
        let outcome = &lines[0];
        assert_eq!(outcome["success"], false);
        assert_eq!(outcome["failures"].as_array().map(Vec::len), Some(1));
    }

    #[rstest]
    fn baseline_mode_keeps_edits_to_already_broken_files(mut world: TestWorld) {
        let path = world.file("legacy.md", "const x = 1\n;\n;");
        let reports = world.dir.path().join("reports");
        let loader = StaticConfigLoader {
            config: Config {
                max_error_increase: Some(0),
                report_dir: Some(Utf8PathBuf::from_path_buf(reports.clone()).expect("utf-8")),
                ..world.config()
            },
        };

        let exit = world.run_with(
            &[
                "guard", "--file", text(&path), "--", "sh", "-c", OVERWRITE, "sh", text(&path),
                "const y = 1\\n;\\n;",
            ],
            &loader,
        );

        assert_eq!(exit, ExitCode::SUCCESS);
        assert_eq!(fs::read_to_string(&path).expect("read"), "const y = 1\n;\n;");
        let lines = world.json_lines();
        let outcome = &lines[0]["outcomes"][0];
        assert_eq!(outcome["success"], true);
        assert_eq!(outcome["baseline"]["is_valid"], false);
        let written = fs::read_dir(&reports).map(Iterator::count).unwrap_or(0);
        assert_eq!(written, 1);
    }

    #[rstest]
    fn failing_command_restores_and_reports(mut world: TestWorld) {
        let path = world.file("notes.md", "original");

        let exit = world.run(&[
            "guard",
            "--file",
            text(&path),
            "--",
            "sh",
            "-c",
            "printf broken > \"$1\"; exit 4",
            "sh",
            text(&path),
        ]);

        assert_eq!(exit, ExitCode::FAILURE);
        assert_eq!(fs::read_to_string(&path).expect("read"), "original");
        assert!(world.stderr().contains("mutation failed"));
    }
}
