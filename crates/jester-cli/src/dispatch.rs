//! Command dispatch for the interactive session.
//!
//! A [`DispatchTable`] maps lower-case command names to [`Handler`]s. The
//! [`Dispatcher`] looks names up, reports unknown ones, and contains handler
//! failures so a single bad command never ends the session.

use std::collections::HashMap;
use std::io::{self, Write};

use jester_config::UnknownCommandPolicy;
use jester_protocol::{CommandRequest, ProtocolError, RemoteCall, ResponseValue};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::output::{ResolvedOutputFormat, render_response};

/// Whether the session keeps reading commands after a handler returns.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Flow {
    Continue,
    Exit,
}

/// Failure raised by a command handler.
#[derive(Debug, Error)]
pub(crate) enum HandlerError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("usage: {0}")]
    Usage(String),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Everything a handler may touch while it runs.
pub(crate) struct CommandContext<'a> {
    pub(crate) remote: &'a dyn RemoteCall,
    pub(crate) out: &'a mut dyn Write,
    pub(crate) err: &'a mut dyn Write,
    pub(crate) format: ResolvedOutputFormat,
}

impl CommandContext<'_> {
    /// Executes `request` and returns the raw response.
    pub(crate) fn fetch(&self, request: &CommandRequest) -> Result<ResponseValue, HandlerError> {
        Ok(self.remote.execute(request)?)
    }

    /// Executes `request` and renders the response for the operator.
    pub(crate) fn send(&mut self, request: &CommandRequest) -> Result<(), HandlerError> {
        let response = self.fetch(request)?;
        render_response(&mut *self.out, self.format, &response)?;
        Ok(())
    }
}

pub(crate) type NullaryFn = fn(&mut CommandContext<'_>) -> Result<Flow, HandlerError>;
pub(crate) type WithArgsFn = fn(&mut CommandContext<'_>, &[String]) -> Result<Flow, HandlerError>;

/// A registered command implementation.
#[derive(Clone, Copy)]
pub(crate) enum Handler {
    /// Ignores any arguments typed after the command name.
    Nullary(NullaryFn),
    /// Receives the whitespace-separated arguments.
    WithArgs(WithArgsFn),
}

impl Handler {
    fn invoke(self, context: &mut CommandContext<'_>, args: &[String]) -> Result<Flow, HandlerError> {
        match self {
            Self::Nullary(handler) => handler(context),
            Self::WithArgs(handler) => handler(context, args),
        }
    }
}

/// Immutable mapping from command names to handlers.
#[derive(Default)]
pub(crate) struct DispatchTable {
    entries: HashMap<String, Handler>,
}

impl DispatchTable {
    /// Registers `handler` under `name`, folded to lower case.
    #[must_use]
    pub(crate) fn with(mut self, name: &str, handler: Handler) -> Self {
        self.entries.insert(name.to_lowercase(), handler);
        self
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<Handler> {
        self.entries.get(&name.to_lowercase()).copied()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// How a single dispatch ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum DispatchOutcome {
    Completed,
    Exit,
    Unknown,
    Failed,
}

impl DispatchOutcome {
    pub(crate) const fn should_continue(self) -> bool {
        !matches!(self, Self::Exit)
    }
}

/// Routes command names to handlers.
pub(crate) struct Dispatcher {
    table: DispatchTable,
    unknown: UnknownCommandPolicy,
}

impl Dispatcher {
    pub(crate) const fn new(table: DispatchTable, unknown: UnknownCommandPolicy) -> Self {
        Self { table, unknown }
    }

    /// Runs `name` and reports whether the session should continue.
    pub(crate) fn dispatch(&self, name: &str, args: &[String], context: &mut CommandContext<'_>) -> bool {
        self.run(name, args, context).should_continue()
    }

    pub(crate) fn run(
        &self,
        name: &str,
        args: &[String],
        context: &mut CommandContext<'_>,
    ) -> DispatchOutcome {
        let result = match (self.table.lookup(name), self.unknown) {
            (Some(handler), _) => {
                info!(command = name, "processing command");
                handler.invoke(context, args)
            }
            (None, UnknownCommandPolicy::Forward) => {
                info!(command = name, "forwarding unregistered command");
                forward(name, args, context)
            }
            (None, UnknownCommandPolicy::Reject) => {
                warn!(command = name, "unknown command");
                let _ = writeln!(context.err, "Unknown command: {name}");
                return DispatchOutcome::Unknown;
            }
        };

        match result {
            Ok(Flow::Continue) => DispatchOutcome::Completed,
            Ok(Flow::Exit) => DispatchOutcome::Exit,
            Err(failure) => {
                error!(command = name, error = %failure, "command failed");
                let _ = writeln!(context.err, "Command '{name}' failed: {failure}");
                DispatchOutcome::Failed
            }
        }
    }
}

fn forward(name: &str, args: &[String], context: &mut CommandContext<'_>) -> Result<Flow, HandlerError> {
    let request = CommandRequest::new(name)
        .map_err(ProtocolError::from)?
        .with_args(args.iter().cloned().map(Value::String));
    context.send(&request)?;
    Ok(Flow::Continue)
}
