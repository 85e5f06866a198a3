//! Test support utilities for the client runtime.
//!
//! Supplies a scripted [`RemoteCall`] for dispatcher-level tests and a
//! [`TestWorld`] harness that drives the full runtime against an in-process
//! fake game.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::{self, Cursor};
use std::process::ExitCode;

use anyhow::{Context, Result, ensure};
use camino::Utf8PathBuf;
use jester_config::Config;
use jester_protocol::test_support::{FakeGame, Reply, unused_endpoint};
use jester_protocol::{CommandRequest, ProtocolError, RemoteCall, ResponseValue};
use rstest::fixture;
use serde_json::Value;

use crate::launcher::{GameLauncher, LaunchError, LaunchedGame};
use crate::{AppError, ConfigLoader, IoStreams, run_with_launcher};

/// A connection-refused failure as the real client reports it.
pub(crate) fn refused() -> ProtocolError {
    ProtocolError::ConnectionRefused {
        endpoint: String::from("tcp://127.0.0.1:1"),
        source: io::Error::from(io::ErrorKind::ConnectionRefused),
    }
}

/// Replays queued results and records every request as JSON.
///
/// Once the queue is empty every further request is refused.
#[derive(Default)]
pub(crate) struct ScriptedRemote {
    replies: RefCell<VecDeque<Result<ResponseValue, ProtocolError>>>,
    requests: RefCell<Vec<Value>>,
}

impl ScriptedRemote {
    pub(crate) fn replying(replies: Vec<Result<ResponseValue, ProtocolError>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            requests: RefCell::default(),
        }
    }

    pub(crate) fn requests(&self) -> Vec<Value> {
        self.requests.borrow().clone()
    }
}

impl RemoteCall for ScriptedRemote {
    fn execute(&self, request: &CommandRequest) -> Result<ResponseValue, ProtocolError> {
        let recorded = serde_json::to_value(request).expect("serialise request");
        self.requests.borrow_mut().push(recorded);
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(refused()))
    }
}

/// A config loader that returns a fixed configuration for tests.
pub(super) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(super) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Counts launches and optionally fails them.
#[derive(Default)]
pub(super) struct StubLauncher {
    fail: bool,
    launches: Cell<usize>,
}

impl GameLauncher for StubLauncher {
    fn launch(&self) -> Result<LaunchedGame, LaunchError> {
        self.launches.set(self.launches.get() + 1);
        if self.fail {
            return Err(LaunchError::Spawn {
                program: String::from("love"),
                dir: Utf8PathBuf::from("game/game_files"),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        Ok(LaunchedGame::none())
    }
}

/// Test world holding runtime state, the fake game and captured output.
#[derive(Default)]
pub(super) struct TestWorld {
    pub config: Config,
    pub game: Option<FakeGame>,
    pub flags: Vec<String>,
    pub input: String,
    pub launcher: StubLauncher,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<ExitCode>,
    pub requests: Vec<Value>,
}

impl TestWorld {
    pub fn start_game(&mut self, replies: Vec<Reply>) -> Result<()> {
        let game = FakeGame::spawn(replies)?;
        self.config.game_endpoint = game.endpoint();
        self.game = Some(game);
        Ok(())
    }

    pub fn without_game(&mut self) -> Result<()> {
        self.config.game_endpoint = unused_endpoint()?;
        self.game = None;
        Ok(())
    }

    pub fn fail_launches(&mut self) {
        self.launcher.fail = true;
    }

    pub fn type_line(&mut self, line: &str) {
        self.input.push_str(line);
        self.input.push('\n');
    }

    pub fn run(&mut self) -> Result<()> {
        self.stdout.clear();
        self.stderr.clear();
        self.requests.clear();
        let args = std::iter::once(String::from("jester"))
            .chain(self.flags.iter().cloned())
            .map(OsString::from);
        let loader = StaticConfigLoader::new(self.config.clone());
        let mut input = Cursor::new(self.input.clone().into_bytes());
        let io = IoStreams::detached(&mut input, &mut self.stdout, &mut self.stderr);
        let exit = run_with_launcher(args, io, &loader, &self.launcher);
        self.exit_code = Some(exit);
        if let Some(mut game) = self.game.take() {
            self.requests = game
                .finish()?
                .iter()
                .map(|line| serde_json::from_str(line))
                .collect::<Result<_, _>>()
                .context("requests are JSON")?;
        }
        Ok(())
    }

    pub fn stdout_text(&self) -> Result<String> {
        decode_utf8(self.stdout.clone(), "stdout")
    }

    pub fn stderr_text(&self) -> Result<String> {
        decode_utf8(self.stderr.clone(), "stderr")
    }

    pub fn launches(&self) -> usize {
        self.launcher.launches.get()
    }

    pub fn assert_exit_code(&self, expected: u8) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(
            exit == ExitCode::from(expected),
            "expected exit code {expected}, got {:?}",
            exit
        );
        Ok(())
    }

    pub fn assert_request(&self, position: usize, command: &str, args: &[&str]) -> Result<()> {
        let request = position
            .checked_sub(1)
            .and_then(|index| self.requests.get(index))
            .with_context(|| format!("request {position} missing from {:?}", self.requests))?;
        let expected = serde_json::json!({ "command": command, "args": args });
        ensure!(
            request == &expected,
            "request {position} mismatch: expected {expected}, got {request}"
        );
        Ok(())
    }
}

pub(super) fn decode_utf8(buffer: Vec<u8>, label: &str) -> Result<String> {
    String::from_utf8(buffer).with_context(|| format!("{label} utf8"))
}

#[fixture]
pub(super) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}
