//! Built-in commands understood by the client.
//!
//! Most commands are thin wrappers that shape a request for the game's
//! scripting server; `call` passes its arguments through untouched. The
//! `safe_command_router` entry point on the game side accepts an action name
//! followed by its arguments.

use jester_protocol::{CommandRequest, ProtocolError, RemoteCall};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::dispatch::{CommandContext, DispatchTable, Flow, Handler, HandlerError};
use crate::output::{render_response, render_structure};

/// Remote function that guards game-side actions.
const SAFE_ROUTER: &str = "safe_command_router";
const TEST_MESSAGE: &str = "This is a test message!";

/// A command as presented by `help`.
pub(crate) struct CommandSpec {
    pub(crate) names: &'static [&'static str],
    pub(crate) usage: &'static str,
    pub(crate) summary: &'static str,
    pub(crate) handler: Handler,
}

pub(crate) const CATALOGUE: &[CommandSpec] = &[
    CommandSpec {
        names: &["exit", "quit"],
        usage: "",
        summary: "ask the game to quit and close the client",
        handler: Handler::Nullary(exit),
    },
    CommandSpec {
        names: &["test", "send_test_message"],
        usage: "",
        summary: "write a test message to the game log",
        handler: Handler::Nullary(send_test_message),
    },
    CommandSpec {
        names: &["call"],
        usage: "<function> [args...]",
        summary: "call a game function with the given arguments",
        handler: Handler::WithArgs(call),
    },
    CommandSpec {
        names: &["play", "play_cards", "play_highlighted"],
        usage: "",
        summary: "play the highlighted cards",
        handler: Handler::Nullary(play_highlighted),
    },
    CommandSpec {
        names: &["select_blind"],
        usage: "",
        summary: "select the current blind",
        handler: Handler::Nullary(select_blind),
    },
    CommandSpec {
        names: &["start_run"],
        usage: "",
        summary: "start a new run",
        handler: Handler::Nullary(start_run),
    },
    CommandSpec {
        names: &["log"],
        usage: "<text...>",
        summary: "write each argument to the game log",
        handler: Handler::WithArgs(log),
    },
    CommandSpec {
        names: &["list_keys"],
        usage: "<path>",
        summary: "list the keys of the table at a path such as GAME.hands[1]",
        handler: Handler::WithArgs(list_keys),
    },
    CommandSpec {
        names: &["get_game_state"],
        usage: "[path]",
        summary: "fetch the game state, or the part of it at a path",
        handler: Handler::WithArgs(get_game_state),
    },
    CommandSpec {
        names: &["structure"],
        usage: "[path]",
        summary: "show the shape of the game state instead of its values",
        handler: Handler::WithArgs(structure),
    },
    CommandSpec {
        names: &["list_buttons"],
        usage: "",
        summary: "list the buttons currently on screen",
        handler: Handler::Nullary(list_buttons),
    },
    CommandSpec {
        names: &["click_card"],
        usage: "<index>",
        summary: "click the card at an index in the hand",
        handler: Handler::WithArgs(click_card),
    },
    CommandSpec {
        names: &["click_by_text"],
        usage: "<text...>",
        summary: "click the button showing the given text",
        handler: Handler::WithArgs(click_by_text),
    },
    CommandSpec {
        names: &["click_by_func"],
        usage: "<func_name>",
        summary: "click the button bound to a game function",
        handler: Handler::WithArgs(click_by_func),
    },
    CommandSpec {
        names: &["help", "list_commands"],
        usage: "",
        summary: "show this list",
        handler: Handler::Nullary(help),
    },
];

/// Builds the dispatch table holding every built-in command.
pub(crate) fn builtin_table() -> DispatchTable {
    CATALOGUE.iter().fold(DispatchTable::default(), |table, spec| {
        spec.names
            .iter()
            .fold(table, |table, name| table.with(name, spec.handler))
    })
}

/// Asks the game to quit, tolerating any failure.
///
/// A refused connection means the game is not running, which is the state
/// the caller wants anyway.
pub(crate) fn close_game(remote: &dyn RemoteCall) {
    info!("closing the game");
    match remote.execute(&safe_router_request("quit", &[])) {
        Ok(_) => debug!("game acknowledged quit"),
        Err(error) if error.is_connection_refused() => {
            info!("game is not running; nothing to close");
        }
        Err(error) => warn!(error = %error, "failed to send quit request"),
    }
}

fn safe_router_request(action: &str, args: &[&str]) -> CommandRequest {
    let mut call_args = vec![SAFE_ROUTER, action];
    call_args.extend_from_slice(args);
    CommandRequest::generic_call(call_args)
}

fn named(command: &str) -> Result<CommandRequest, HandlerError> {
    Ok(CommandRequest::new(command).map_err(ProtocolError::from)?)
}

fn send(context: &mut CommandContext<'_>, request: &CommandRequest) -> Result<Flow, HandlerError> {
    context.send(request)?;
    Ok(Flow::Continue)
}

/// Always ends the session, even when the farewell cannot be written.
fn exit(context: &mut CommandContext<'_>) -> Result<Flow, HandlerError> {
    info!("exiting application");
    close_game(context.remote);
    if let Err(error) = writeln!(context.out, "Exiting.") {
        debug!(error = %error, "could not write exit message");
    }
    Ok(Flow::Exit)
}

fn send_test_message(context: &mut CommandContext<'_>) -> Result<Flow, HandlerError> {
    send(context, &safe_router_request("log", &[TEST_MESSAGE]))
}

fn call(context: &mut CommandContext<'_>, args: &[String]) -> Result<Flow, HandlerError> {
    if args.is_empty() {
        return Err(HandlerError::Usage("call <function> [args...]".to_owned()));
    }
    send(context, &CommandRequest::generic_call(args.iter().cloned()))
}

fn play_highlighted(context: &mut CommandContext<'_>) -> Result<Flow, HandlerError> {
    send(context, &CommandRequest::generic_call(["play_cards_from_highlighted"]))
}

fn select_blind(context: &mut CommandContext<'_>) -> Result<Flow, HandlerError> {
    send(context, &CommandRequest::generic_call(["select_blind"]))
}

fn start_run(context: &mut CommandContext<'_>) -> Result<Flow, HandlerError> {
    send(context, &safe_router_request("start_run", &[]))
}

fn log(context: &mut CommandContext<'_>, args: &[String]) -> Result<Flow, HandlerError> {
    if args.is_empty() {
        return Err(HandlerError::Usage("log <text...>".to_owned()));
    }
    for arg in args {
        send(context, &safe_router_request("log", &[arg.as_str()]))?;
    }
    Ok(Flow::Continue)
}

fn list_keys(context: &mut CommandContext<'_>, args: &[String]) -> Result<Flow, HandlerError> {
    let [path] = args else {
        return Err(HandlerError::Usage("list_keys <path>".to_owned()));
    };
    send(context, &named("list_keys")?.with_path(path))
}

fn game_state_request(args: &[String], usage: &str) -> Result<CommandRequest, HandlerError> {
    let request = named("get_game_state")?;
    match args {
        [] => Ok(request),
        [path] => Ok(request.with_path(path)),
        _ => Err(HandlerError::Usage(usage.to_owned())),
    }
}

fn get_game_state(context: &mut CommandContext<'_>, args: &[String]) -> Result<Flow, HandlerError> {
    let request = game_state_request(args, "get_game_state [path]")?;
    send(context, &request)
}

fn structure(context: &mut CommandContext<'_>, args: &[String]) -> Result<Flow, HandlerError> {
    let request = game_state_request(args, "structure [path]")?;
    let response = context.fetch(&request)?;
    match response.as_json() {
        Some(state) => render_structure(&mut *context.out, state)?,
        None => render_response(&mut *context.out, context.format, &response)?,
    }
    Ok(Flow::Continue)
}

fn list_buttons(context: &mut CommandContext<'_>) -> Result<Flow, HandlerError> {
    send(context, &named("list_buttons")?)
}

fn click_card(context: &mut CommandContext<'_>, args: &[String]) -> Result<Flow, HandlerError> {
    let usage = || HandlerError::Usage("click_card <index>".to_owned());
    let [index] = args else {
        return Err(usage());
    };
    let index: i64 = index.parse().map_err(|_| usage())?;
    send(context, &named("click_card")?.with_field("index", index))
}

fn click_by_text(context: &mut CommandContext<'_>, args: &[String]) -> Result<Flow, HandlerError> {
    if args.is_empty() {
        return Err(HandlerError::Usage("click_by_text <text...>".to_owned()));
    }
    let text = Value::String(args.join(" "));
    send(context, &named("click_by_text")?.with_field("text", text))
}

fn click_by_func(context: &mut CommandContext<'_>, args: &[String]) -> Result<Flow, HandlerError> {
    let [func_name] = args else {
        return Err(HandlerError::Usage("click_by_func <func_name>".to_owned()));
    };
    send(context, &named("click_by_func")?.with_field("func_name", func_name.as_str()))
}

fn help(context: &mut CommandContext<'_>) -> Result<Flow, HandlerError> {
    writeln!(context.out, "Available commands:")?;
    for spec in CATALOGUE {
        let mut synopsis = spec.names.join(", ");
        if !spec.usage.is_empty() {
            synopsis.push(' ');
            synopsis.push_str(spec.usage);
        }
        writeln!(context.out, "  {synopsis:<36} {}", spec.summary)?;
    }
    writeln!(context.out, "  {:<36} {}", "history", "show the last 10 commands")?;
    context.out.flush()?;
    Ok(Flow::Continue)
}
