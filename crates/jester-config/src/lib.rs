//! Shared configuration for the Jester game remote-control client.
//!
//! Values are layered by `ortho_config`: built-in defaults, then a TOML file
//! named by `--config-path` or `JESTER_CONFIG_PATH`, then `JESTER_*`
//! environment variables, and finally command-line flags.

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

mod commands;
mod defaults;
mod endpoint;
mod logging;

pub use commands::UnknownCommandPolicy;
pub use defaults::{
    DEFAULT_GAME_DIR, DEFAULT_GAME_EXECUTABLE, DEFAULT_GAME_HOST, DEFAULT_GAME_PORT,
    DEFAULT_LAUNCH_GRACE_MS, DEFAULT_LOG_FILTER, DEFAULT_MAX_FRAME_BYTES, default_game_dir,
    default_game_endpoint, default_game_executable, default_launch_grace_ms, default_log_filter,
    default_log_filter_string, default_log_format, default_max_frame_bytes,
    default_unknown_commands,
};
pub use endpoint::{GameEndpoint, GameEndpointParseError};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved client configuration.
///
/// Timeouts are expressed in milliseconds where `0` disables the timeout,
/// which is also the default: requests block until the game answers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "JESTER")]
pub struct Config {
    /// Address of the game's scripting server.
    #[serde(default = "default_game_endpoint")]
    pub game_endpoint: GameEndpoint,
    /// `tracing` filter directive, e.g. `info` or `jester_protocol=debug`.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Log line format.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Connect timeout in milliseconds; `0` waits for the OS default.
    #[serde(default)]
    pub connect_timeout_ms: u64,
    /// Response read timeout in milliseconds; `0` blocks indefinitely.
    #[serde(default)]
    pub read_timeout_ms: u64,
    /// Largest response frame accepted from the game.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: u32,
    /// Executable started to launch the game.
    #[serde(default = "default_game_executable")]
    pub game_executable: String,
    /// Working directory for the launched game.
    #[serde(default = "default_game_dir")]
    pub game_dir: Utf8PathBuf,
    /// Milliseconds to wait after launching before accepting commands.
    #[serde(default = "default_launch_grace_ms")]
    pub launch_grace_ms: u64,
    /// Treatment of command names the client does not know.
    #[serde(default = "default_unknown_commands")]
    pub unknown_commands: UnknownCommandPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            game_endpoint: default_game_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            connect_timeout_ms: 0,
            read_timeout_ms: 0,
            max_frame_bytes: default_max_frame_bytes(),
            game_executable: default_game_executable(),
            game_dir: default_game_dir(),
            launch_grace_ms: default_launch_grace_ms(),
            unknown_commands: default_unknown_commands(),
        }
    }
}

impl Config {
    /// Loads configuration from the given command-line arguments, including
    /// the program name in the first position, merged with the file and
    /// environment layers.
    pub fn load_from_args(args: Vec<OsString>) -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Address of the game's scripting server.
    #[must_use]
    pub const fn game_endpoint(&self) -> &GameEndpoint {
        &self.game_endpoint
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log line format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Connect timeout, when one is configured.
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.connect_timeout_ms)
    }

    /// Response read timeout, when one is configured.
    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.read_timeout_ms)
    }

    /// Grace period applied after launching the game.
    #[must_use]
    pub const fn launch_grace(&self) -> Duration {
        Duration::from_millis(self.launch_grace_ms)
    }
}

fn non_zero_millis(millis: u64) -> Option<Duration> {
    (millis > 0).then(|| Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_local_game_server() {
        let config = Config::default();
        assert_eq!(config.game_endpoint().to_string(), "tcp://127.0.0.1:12345");
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.log_format(), LogFormat::Compact);
        assert_eq!(config.unknown_commands, UnknownCommandPolicy::Reject);
    }

    #[test]
    fn zero_timeouts_are_disabled() {
        let config = Config::default();
        assert_eq!(config.connect_timeout(), None);
        assert_eq!(config.read_timeout(), None);
    }

    #[test]
    fn non_zero_timeouts_become_durations() {
        let config = Config {
            connect_timeout_ms: 250,
            read_timeout_ms: 5_000,
            ..Config::default()
        };
        assert_eq!(config.connect_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.read_timeout(), Some(Duration::from_secs(5)));
    }
}
