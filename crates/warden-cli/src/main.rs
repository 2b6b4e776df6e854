//! CLI entrypoint for the Warden backup-verify-restore harness.
//!
//! The binary delegates to [`warden_cli::run`], which loads layered
//! configuration, installs logging and runs the requested command.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    warden_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
