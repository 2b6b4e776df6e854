//! Implementations of the `validate` and `guard` subcommands.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode, Stdio};

use serde::Serialize;
use tracing::info;
use warden_harness::tool::ToolRunner;
use warden_harness::{Harness, MutationError, ThresholdConfig, ValidationReport, accepts};

use crate::errors::AppError;

const COMMAND_TARGET: &str = "warden_cli::commands";

/// One line of `validate` output.
#[derive(Debug, Serialize)]
struct FileReport<'a> {
    path: &'a Path,
    accepted: bool,
    report: ValidationReport,
}

/// Validates each path and writes a JSON line per file.
///
/// Exits with failure when any file is rejected under `thresholds`.
pub(crate) fn validate<R, W>(
    harness: &Harness<R>,
    paths: &[PathBuf],
    thresholds: &ThresholdConfig,
    stdout: &mut W,
) -> Result<ExitCode, AppError>
where
    R: ToolRunner,
    W: Write,
{
    let mut rejected = 0usize;
    for path in paths {
        let report = harness.validate_file(path);
        let accepted = accepts(&report, thresholds);
        if !accepted {
            rejected += 1;
        }
        serde_json::to_writer(
            &mut *stdout,
            &FileReport {
                path,
                accepted,
                report,
            },
        )?;
        writeln!(stdout)?;
    }

    info!(target: COMMAND_TARGET, files = paths.len(), rejected, "validation complete");
    Ok(exit_code(rejected == 0))
}

/// Runs `command` as a batch mutation over `files` and writes the outcome.
pub(crate) fn guard<R, W, E>(
    harness: &mut Harness<R>,
    files: &[PathBuf],
    command: &[String],
    thresholds: &ThresholdConfig,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<ExitCode, AppError>
where
    R: ToolRunner,
    W: Write,
    E: Write,
{
    let outcome = harness.run_batch(files, || run_mutation(command, stderr), thresholds)?;
    serde_json::to_writer(&mut *stdout, &outcome)?;
    writeln!(stdout)?;
    Ok(exit_code(outcome.success()))
}

/// Runs the mutating command, forwarding its output to `stderr`.
fn run_mutation<E: Write>(command: &[String], stderr: &mut E) -> Result<(), MutationError> {
    let (program, arguments) = command
        .split_first()
        .ok_or("no mutation command was given")?;
    info!(target: COMMAND_TARGET, program = %program, ?arguments, "running mutation");

    let output = Command::new(program)
        .args(arguments)
        .stdin(Stdio::null())
        .output()
        .map_err(|error| format!("failed to run '{program}': {error}"))?;
    stderr.write_all(&output.stdout)?;
    stderr.write_all(&output.stderr)?;

    if output.status.success() {
        Ok(())
    } else {
        Err(format!("'{program}' exited with {}", output.status).into())
    }
}

const fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
