//! Configuration loading for the client binary.
//!
//! Leading arguments that name configuration flags are handed to
//! `ortho_config`; everything from the first other argument onwards belongs
//! to the client's own parser.

use std::ffi::{OsStr, OsString};

use jester_config::Config;

use crate::AppError;

pub(crate) trait ConfigLoader {
    /// Loads configuration from the filtered argument list.
    ///
    /// # Flag Ordering
    ///
    /// Configuration flags (listed in `CONFIG_CLI_FLAGS`) must come before
    /// the client's own flags such as `--no-launch`. Anything after the first
    /// non-configuration argument is left to the client's parser.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_args(args.to_vec()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Stop,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    let Some(body) = text.strip_prefix("--") else {
        return FlagAction::Stop;
    };
    let (flag, inline_value) = match body.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (body, false),
    };
    if super::CONFIG_CLI_FLAGS
        .iter()
        .any(|known| known.strip_prefix("--") == Some(flag))
    {
        FlagAction::Include {
            needs_value: !inline_value,
        }
    } else {
        FlagAction::Stop
    }
}

/// Arguments for the configuration loader, plus where the client's own
/// arguments begin.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some(program) = args.first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut remaining = args.iter().skip(1);
    let mut command_start = 1;
    while let Some(argument) = remaining.next() {
        let FlagAction::Include { needs_value } = classify(argument) else {
            break;
        };
        config_arguments.push(argument.clone());
        command_start += 1;
        if needs_value {
            if let Some(value) = remaining.next() {
                config_arguments.push(value.clone());
                command_start += 1;
            }
        }
    }

    ConfigArgumentSplit {
        config_arguments,
        command_start,
    }
}

/// The program name followed by the client's own arguments.
pub(crate) fn cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    args.first()
        .into_iter()
        .chain(args.iter().skip(split.command_start))
        .cloned()
        .collect()
}
