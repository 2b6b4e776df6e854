//! Command-line runtime for the Warden harness.
//!
//! The runtime splits configuration flags from command tokens, loads layered
//! configuration, installs logging and dispatches to the `validate` or
//! `guard` command. IO streams and the configuration loader are injectable so
//! the runtime can be exercised from tests.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use warden_config::Config;
use warden_harness::{Harness, ThresholdConfig, telemetry};

mod cli;
mod commands;
mod config;
mod errors;

use cli::{Cli, CliCommand};
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
use errors::AppError;

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let arguments: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&arguments);

    let result = Cli::try_parse_from(&split.command_arguments)
        .map_err(AppError::CliUsage)
        .and_then(|cli| {
            loader
                .load(&split.config_arguments)
                .map(|config| (cli, config))
        })
        .and_then(|(cli, config)| {
            telemetry::initialise(&config)?;
            execute(cli.command, &config, stdout, stderr)
        });

    match result {
        Ok(exit_code) => exit_code,
        Err(AppError::CliUsage(error)) if !error.use_stderr() => {
            drop(write!(stdout, "{error}"));
            ExitCode::SUCCESS
        }
        Err(error) => {
            drop(writeln!(stderr, "warden: {error}"));
            ExitCode::FAILURE
        }
    }
}

fn execute<W, E>(
    subcommand: CliCommand,
    config: &Config,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<ExitCode, AppError>
where
    W: Write,
    E: Write,
{
    let thresholds = ThresholdConfig::from_config(config);
    let mut harness = Harness::from_config(config);
    match subcommand {
        CliCommand::Validate { paths } => {
            commands::validate(&harness, &paths, &thresholds, stdout)
        }
        CliCommand::Guard { files, command } => commands::guard(
            &mut harness,
            &files,
            &command,
            &thresholds,
            stdout,
            stderr,
        ),
    }
}

#[cfg(test)]
mod tests;
