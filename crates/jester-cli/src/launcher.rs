//! Starting the game process before the session begins.
//!
//! The game is spawned as `<executable> .` inside its directory and left
//! running on its own; the client never waits for it or stops it. The
//! scripting server needs a moment after start-up before it accepts
//! connections, so the launcher pauses for the configured grace period.

use std::io;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use camino::Utf8PathBuf;
use jester_config::Config;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while starting the game.
#[derive(Debug, Error)]
pub(crate) enum LaunchError {
    #[error("failed to launch game '{program}' in '{dir}': {source}")]
    Spawn {
        program: String,
        dir: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Handle for a game started by the client, if any.
#[derive(Debug)]
pub(crate) struct LaunchedGame {
    child: Option<Child>,
}

impl LaunchedGame {
    /// No process was started.
    pub(crate) const fn none() -> Self {
        Self { child: None }
    }

    pub(crate) fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }
}

/// Something able to bring the game up.
pub(crate) trait GameLauncher {
    fn launch(&self) -> Result<LaunchedGame, LaunchError>;
}

/// Spawns the configured executable.
#[derive(Debug, Clone)]
pub(crate) struct ProcessLauncher {
    program: String,
    dir: Utf8PathBuf,
    grace: Duration,
}

impl ProcessLauncher {
    pub(crate) fn new(program: impl Into<String>, dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: program.into(),
            dir: dir.into(),
            grace: Duration::ZERO,
        }
    }

    pub(crate) fn from_config(config: &Config) -> Self {
        Self::new(config.game_executable.clone(), config.game_dir.clone())
            .with_grace(config.launch_grace())
    }

    #[must_use]
    pub(crate) fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

impl GameLauncher for ProcessLauncher {
    fn launch(&self) -> Result<LaunchedGame, LaunchError> {
        info!(program = %self.program, dir = %self.dir, "launching game");
        let child = Command::new(&self.program)
            .arg(".")
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: self.program.clone(),
                dir: self.dir.clone(),
                source,
            })?;
        info!(pid = child.id(), "game launched");

        if !self.grace.is_zero() {
            debug!(
                grace_ms = self.grace.as_millis(),
                "waiting for the game's scripting server"
            );
            thread::sleep(self.grace);
        }
        Ok(LaunchedGame { child: Some(child) })
    }
}

/// Used with `--no-launch`: assumes the game is already running.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DisabledLauncher;

impl GameLauncher for DisabledLauncher {
    fn launch(&self) -> Result<LaunchedGame, LaunchError> {
        debug!("game launch disabled");
        Ok(LaunchedGame::none())
    }
}
