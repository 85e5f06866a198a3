//! Interactive remote control for the game's embedded scripting server.
//!
//! The runtime loads layered configuration, installs telemetry, optionally
//! launches the game and then reads commands until the operator exits. Every
//! command becomes at most a handful of one-shot request/response exchanges
//! with the game. Configuration loading, the launcher and all IO streams can
//! be substituted so tests can drive the whole runtime in-process.

use std::ffi::OsString;
use std::io::{self, BufRead, IsTerminal, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, error::ErrorKind};
use jester_protocol::{ClientSettings, ProtocolClient};
use ortho_config::OrthoError;
use thiserror::Error;
use tracing::{error, info};

mod commands;
mod config;
mod dispatch;
mod interrupt;
mod launcher;
pub mod output;
mod session;
mod telemetry;

use commands::builtin_table;
use config::{cli_arguments, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
use dispatch::Dispatcher;
use launcher::{DisabledLauncher, GameLauncher, LaunchError, ProcessLauncher};
pub use output::{OutputFormat, ResolvedOutputFormat};
use session::{Session, SessionError};
use telemetry::TelemetryError;

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: This list must be kept in sync with the fields of
/// `jester_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--game-endpoint",
    "--log-filter",
    "--log-format",
    "--connect-timeout-ms",
    "--read-timeout-ms",
    "--max-frame-bytes",
    "--game-executable",
    "--game-dir",
    "--launch-grace-ms",
    "--unknown-commands",
];

const CONFIG_HELP: &str = "\
Configuration flags (must come before the options above):
  --config-path <PATH>          TOML configuration file [env: JESTER_CONFIG_PATH]
  --game-endpoint <ENDPOINT>    game scripting server, tcp://host:port [default: tcp://127.0.0.1:12345]
  --log-filter <FILTER>         tracing filter directive [default: info]
  --log-format <FORMAT>         compact or json [default: compact]
  --connect-timeout-ms <MS>     connect timeout, 0 waits indefinitely [default: 0]
  --read-timeout-ms <MS>        response timeout, 0 waits indefinitely [default: 0]
  --max-frame-bytes <BYTES>     largest accepted response frame [default: 67108864]
  --game-executable <PROGRAM>   program started to launch the game [default: love]
  --game-dir <DIR>              directory the game is launched in [default: game/game_files]
  --launch-grace-ms <MS>        pause after launching the game [default: 3000]
  --unknown-commands <POLICY>   reject or forward unregistered commands [default: reject]

Every configuration flag may also be set through a JESTER_* environment variable.";

const BANNER: &str = "\
--------------------
Jester command client
Type a command and press Enter. Type 'quit' or 'exit' to close.";

#[derive(Debug, Parser)]
#[command(
    name = "jester",
    version,
    about = "Send commands to a running game's scripting server",
    after_help = CONFIG_HELP
)]
pub(crate) struct Cli {
    /// Connect to a game that is already running instead of launching one.
    #[arg(long)]
    no_launch: bool,
    /// Output format for game responses.
    #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,
}

/// Errors that stop the client before or during the session.
#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<OrthoError>),
    #[error(transparent)]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to install the interrupt handler: {0}")]
    InstallInterruptHandler(#[source] io::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// The streams a run reads from and writes to.
pub(crate) struct IoStreams<'a, R: BufRead, W: Write, E: Write> {
    pub(crate) input: &'a mut R,
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
    stdin_is_terminal: bool,
    stdout_is_terminal: bool,
}

impl<'a, R: BufRead, W: Write, E: Write> IoStreams<'a, R, W, E> {
    pub(crate) fn new(input: &'a mut R, stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self {
            input,
            stdout,
            stderr,
            stdin_is_terminal: io::stdin().is_terminal(),
            stdout_is_terminal: io::stdout().is_terminal(),
        }
    }

    #[cfg(test)]
    pub(crate) fn detached(input: &'a mut R, stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self {
            input,
            stdout,
            stderr,
            stdin_is_terminal: false,
            stdout_is_terminal: false,
        }
    }

    const fn interactive(&self) -> bool {
        self.stdin_is_terminal && self.stdout_is_terminal
    }
}

struct CliRunner<'a, R: BufRead, W: Write, E: Write, L: ConfigLoader> {
    io: IoStreams<'a, R, W, E>,
    loader: &'a L,
    launcher: Option<&'a dyn GameLauncher>,
    install_interrupt: bool,
}

impl<'a, R, W, E, L> CliRunner<'a, R, W, E, L>
where
    R: BufRead,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(io: IoStreams<'a, R, W, E>, loader: &'a L) -> Self {
        Self {
            io,
            loader,
            launcher: None,
            install_interrupt: true,
        }
    }

    #[cfg(test)]
    fn with_launcher(mut self, launcher: &'a dyn GameLauncher) -> Self {
        self.launcher = Some(launcher);
        self.install_interrupt = false;
        self
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        match self.try_run(args) {
            Ok(exit_code) => exit_code,
            Err(failure) => {
                error!(error = %failure, "client stopped");
                let _ = writeln!(self.io.stderr, "{failure}");
                ExitCode::FAILURE
            }
        }
    }

    fn try_run<I>(&mut self, args: I) -> Result<ExitCode, AppError>
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli = match Cli::try_parse_from(cli_arguments(&args, &split)) {
            Ok(cli) => cli,
            Err(usage)
                if matches!(
                    usage.kind(),
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
                ) =>
            {
                let _ = write!(self.io.stdout, "{usage}");
                return Ok(ExitCode::SUCCESS);
            }
            Err(usage) => return Err(AppError::CliUsage(usage)),
        };
        let config = self.loader.load(&split.config_arguments)?;
        telemetry::initialise(&config)?;
        info!(endpoint = %config.game_endpoint(), "client starting");

        let settings = ClientSettings::from_config(&config);
        if self.install_interrupt {
            interrupt::install(settings.clone()).map_err(AppError::InstallInterruptHandler)?;
        }

        let process_launcher = ProcessLauncher::from_config(&config);
        let launcher: &dyn GameLauncher = match (self.launcher, cli.no_launch) {
            (_, true) => &DisabledLauncher,
            (Some(injected), false) => injected,
            (None, false) => &process_launcher,
        };
        self.launch_game(launcher);

        let format = cli.output.resolve(self.io.stdout_is_terminal);
        if format == ResolvedOutputFormat::Human {
            writeln!(self.io.stdout, "{BANNER}").map_err(|source| {
                AppError::Session(SessionError::WriteOutput(source))
            })?;
        }

        let client = ProtocolClient::new(settings);
        let dispatcher = Dispatcher::new(builtin_table(), config.unknown_commands);
        let end = Session::new(&dispatcher, &client, format)
            .with_prompt(self.io.interactive())
            .run(&mut *self.io.input, &mut *self.io.stdout, &mut *self.io.stderr)?;
        info!(reason = ?end, "session finished");
        Ok(ExitCode::SUCCESS)
    }

    /// A failed launch is reported but does not stop the session; the game
    /// may already be running.
    fn launch_game(&mut self, launcher: &dyn GameLauncher) {
        match launcher.launch() {
            Ok(game) => {
                if let Some(pid) = game.pid() {
                    info!(pid, "game process started");
                }
            }
            Err(failure) => report_launch_failure(&mut *self.io.stderr, &failure),
        }
    }
}

fn report_launch_failure<E: Write>(stderr: &mut E, failure: &LaunchError) {
    error!(error = %failure, "game launch failed");
    let _ = writeln!(stderr, "{failure}");
}

/// Runs the client using the provided arguments and IO handles.
#[must_use]
pub fn run<I, R, W, E>(args: I, input: &mut R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    let io = IoStreams::new(input, stdout, stderr);
    run_with_loader(args, io, &OrthoConfigLoader)
}

/// Runs the client with a custom configuration loader.
#[must_use]
pub(crate) fn run_with_loader<'a, I, R, W, E, L>(
    args: I,
    io: IoStreams<'a, R, W, E>,
    loader: &'a L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(io, loader).run(args)
}

/// Runs the client with a custom loader and launcher, without installing
/// the process-wide interrupt handler.
#[cfg(test)]
pub(crate) fn run_with_launcher<'a, I, R, W, E, L>(
    args: I,
    io: IoStreams<'a, R, W, E>,
    loader: &'a L,
    launcher: &'a dyn GameLauncher,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(io, loader).with_launcher(launcher).run(args)
}
