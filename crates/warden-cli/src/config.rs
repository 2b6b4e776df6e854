//! Configuration loading helpers for the Warden CLI.
//!
//! Configuration flags must precede the subcommand. They are split off and
//! handed to `ortho_config`, while the remaining tokens go to the command
//! parser.

use std::ffi::{OsStr, OsString};

use warden_config::{CONFIG_CLI_FLAGS, Config, OrthoConfig};

use crate::errors::AppError;

pub(crate) trait ConfigLoader {
    /// Loads configuration from defaults, files, environment and `args`.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Stop,
}

fn process_config_flag(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Stop;
    }

    let (flag, has_inline_value) = text
        .split_once('=')
        .map_or((&*text, false), |(flag, _)| (flag, true));

    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !has_inline_value,
        }
    } else {
        FlagAction::Stop
    }
}

/// Arguments partitioned between the configuration loader and the command
/// parser. Both lists start with the program name.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_arguments: Vec<OsString>,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let mut remaining = args.iter();
    let Some(program) = remaining.next() else {
        return ConfigArgumentSplit::default();
    };

    let mut split = ConfigArgumentSplit {
        config_arguments: vec![program.clone()],
        command_arguments: vec![program.clone()],
    };

    while let Some(argument) = remaining.next() {
        match process_config_flag(argument) {
            FlagAction::Include { needs_value } => {
                split.config_arguments.push(argument.clone());
                if needs_value {
                    split.config_arguments.extend(remaining.next().cloned());
                }
            }
            FlagAction::Stop => {
                split.command_arguments.push(argument.clone());
                split.command_arguments.extend(remaining.by_ref().cloned());
            }
        }
    }
    split
}
