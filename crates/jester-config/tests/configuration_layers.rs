//! Layering behaviour of the configuration loader: file values override the
//! defaults and command-line flags override file values.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use jester_config::{Config, LogFormat, UnknownCommandPolicy};
use once_cell::sync::Lazy;
use tempfile::TempDir;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct EnvOverride {
    key: &'static str,
    previous: Option<OsString>,
    guard: Option<MutexGuard<'static, ()>>,
}

impl EnvOverride {
    fn set_var(key: &'static str, value: &OsStr) -> Self {
        let guard = ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let previous = std::env::var_os(key);
        // Environment mutation is unsafe in edition 2024; the override is
        // restored in `Drop` while the mutex is still held.
        unsafe { std::env::set_var(key, value) };
        Self {
            key,
            previous,
            guard: Some(guard),
        }
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
        drop(self.guard.take());
    }
}

fn write_config(dir: &Path, contents: &str) -> OsString {
    let path = dir.join("jester.toml");
    fs::write(&path, contents).expect("write configuration");
    path.into_os_string()
}

fn args(extra: &[&OsStr]) -> Vec<OsString> {
    let mut args = vec![OsString::from("jester")];
    args.extend(extra.iter().map(|arg| arg.to_os_string()));
    args
}

#[test]
fn file_values_override_defaults() {
    let _lock = ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = write_config(
        temp_dir.path(),
        concat!(
            "game_endpoint = \"tcp://10.0.0.2:4000\"\n",
            "log_format = \"json\"\n",
            "read_timeout_ms = 1500\n",
            "unknown_commands = \"forward\"\n",
        ),
    );

    let config = Config::load_from_args(args(&[OsStr::new("--config-path"), &path]))
        .expect("configuration should load");

    assert_eq!(config.game_endpoint().host(), "10.0.0.2");
    assert_eq!(config.game_endpoint().port(), 4000);
    assert_eq!(config.log_format(), LogFormat::Json);
    assert_eq!(config.read_timeout_ms, 1500);
    assert_eq!(config.unknown_commands, UnknownCommandPolicy::Forward);
    assert_eq!(config.log_filter(), "info");
}

#[test]
fn cli_flags_override_file_values() {
    let _lock = ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = write_config(temp_dir.path(), "game_endpoint = \"tcp://10.0.0.2:4000\"\n");

    let config = Config::load_from_args(args(&[
        OsStr::new("--config-path"),
        &path,
        OsStr::new("--game-endpoint"),
        OsStr::new("tcp://127.0.0.1:23456"),
    ]))
    .expect("configuration should load");

    assert_eq!(config.game_endpoint().to_string(), "tcp://127.0.0.1:23456");
}

#[test]
fn config_path_can_come_from_environment() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = write_config(temp_dir.path(), "log_filter = \"debug\"\n");
    let _env = EnvOverride::set_var("JESTER_CONFIG_PATH", &path);

    let config = Config::load_from_args(args(&[])).expect("configuration should load");

    assert_eq!(config.log_filter(), "debug");
}

#[test]
fn malformed_endpoint_is_rejected() {
    let _lock = ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let error = Config::load_from_args(args(&[
        OsStr::new("--game-endpoint"),
        OsStr::new("unix:///tmp/game.sock"),
    ]))
    .expect_err("unix endpoints are unsupported");

    assert!(
        error.to_string().contains("game"),
        "unexpected error text: {error}"
    );
}
