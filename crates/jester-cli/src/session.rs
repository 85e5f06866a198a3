//! The interactive read-dispatch loop.

use std::io::{self, BufRead, Write};

use jester_protocol::RemoteCall;
use thiserror::Error;
use tracing::{debug, info};

use crate::commands::close_game;
use crate::dispatch::{CommandContext, Dispatcher};
use crate::output::ResolvedOutputFormat;

/// Number of entries shown by `history`.
pub(crate) const HISTORY_WINDOW: usize = 10;
const PROMPT: &str = "> ";
const HISTORY_COMMAND: &str = "history";

/// Errors that end the session early.
#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("failed to read command input: {0}")]
    ReadInput(#[source] io::Error),
    #[error("failed to write to the terminal: {0}")]
    WriteOutput(#[source] io::Error),
}

/// Why the loop stopped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SessionEnd {
    /// A command asked to exit.
    Exit,
    /// The input stream ended; the game was asked to quit.
    EndOfInput,
}

/// Reads command lines and hands them to the dispatcher until one of them
/// asks to exit or input runs out.
pub(crate) struct Session<'a> {
    dispatcher: &'a Dispatcher,
    remote: &'a dyn RemoteCall,
    format: ResolvedOutputFormat,
    prompt: bool,
    history: Vec<String>,
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        dispatcher: &'a Dispatcher,
        remote: &'a dyn RemoteCall,
        format: ResolvedOutputFormat,
    ) -> Self {
        Self {
            dispatcher,
            remote,
            format,
            prompt: false,
            history: Vec::new(),
        }
    }

    /// Prints `> ` before each read.
    #[must_use]
    pub(crate) fn with_prompt(mut self, prompt: bool) -> Self {
        self.prompt = prompt;
        self
    }

    /// Every non-empty line read so far, oldest first.
    #[cfg(test)]
    pub(crate) fn history(&self) -> &[String] {
        &self.history
    }

    pub(crate) fn run<R, W, E>(
        &mut self,
        input: &mut R,
        out: &mut W,
        err: &mut E,
    ) -> Result<SessionEnd, SessionError>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        let mut line = String::new();
        loop {
            if self.prompt {
                write!(out, "{PROMPT}")
                    .and_then(|()| out.flush())
                    .map_err(SessionError::WriteOutput)?;
            }

            line.clear();
            if input.read_line(&mut line).map_err(SessionError::ReadInput)? == 0 {
                info!("input closed; exiting");
                close_game(self.remote);
                return Ok(SessionEnd::EndOfInput);
            }

            let entry = line.trim_end_matches(['\r', '\n']);
            let mut tokens = entry.split_whitespace();
            let Some(first) = tokens.next() else {
                continue;
            };
            self.history.push(entry.to_owned());
            info!(command = entry, "received command");

            let name = first.to_lowercase();
            let args: Vec<String> = tokens.map(str::to_owned).collect();
            if name == HISTORY_COMMAND {
                self.write_history(out).map_err(SessionError::WriteOutput)?;
                continue;
            }

            let mut context = CommandContext {
                remote: self.remote,
                out: &mut *out,
                err: &mut *err,
                format: self.format,
            };
            if !self.dispatcher.dispatch(&name, &args, &mut context) {
                debug!("leaving command loop");
                return Ok(SessionEnd::Exit);
            }
        }
    }

    /// Writes the most recent entries, numbered so that `1` is the newest.
    fn write_history<W>(&self, out: &mut W) -> io::Result<()>
    where
        W: Write,
    {
        let start = self.history.len().saturating_sub(HISTORY_WINDOW);
        let recent = self.history.get(start..).unwrap_or_default();
        for (offset, entry) in recent.iter().enumerate() {
            writeln!(out, "{}: {entry}", recent.len() - offset)?;
        }
        out.flush()
    }
}
