//! Command requests sent to the game's scripting server.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::RequestError;
use crate::path::{self, PathExpression};

/// Command name of a generic remote call, whose `args` name a function and
/// its parameters for the game to interpret.
pub const GENERIC_CALL: &str = "call";

const RESERVED_KEYS: [&str; 3] = ["command", "args", "path"];

/// A single request: `{ command, args?, path?, ...fields }`.
///
/// `path` can only be set from a path expression string, and extra fields
/// never shadow the three reserved keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandRequest {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathExpression>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl CommandRequest {
    /// Starts a request for `command`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::EmptyCommand`] when the name is blank.
    pub fn new(command: impl Into<String>) -> Result<Self, RequestError> {
        let command = command.into();
        if command.trim().is_empty() {
            return Err(RequestError::EmptyCommand);
        }
        Ok(Self {
            command,
            args: None,
            path: None,
            fields: Map::new(),
        })
    }

    /// Starts a generic remote call carrying `args` verbatim.
    #[must_use]
    pub fn generic_call<I, V>(args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            command: GENERIC_CALL.to_owned(),
            args: None,
            path: None,
            fields: Map::new(),
        }
        .with_args(args)
    }

    /// Sets the positional arguments.
    #[must_use]
    pub fn with_args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the path by parsing `expression`.
    #[must_use]
    pub fn with_path(mut self, expression: &str) -> Self {
        self.path = Some(path::parse(expression));
        self
    }

    /// Adds a named field forwarded verbatim. Reserved keys are ignored.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if RESERVED_KEYS.contains(&key.as_str()) {
            warn!(field = %key, command = %self.command, "ignoring reserved request field");
            return self;
        }
        self.fields.insert(key, value.into());
        self
    }

    /// Adds every entry of `fields`, ignoring reserved keys.
    #[must_use]
    pub fn with_fields(self, fields: Map<String, Value>) -> Self {
        fields
            .into_iter()
            .fold(self, |request, (key, value)| request.with_field(key, value))
    }

    /// Command name.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Positional arguments, when set.
    #[must_use]
    pub fn args(&self) -> Option<&[Value]> {
        self.args.as_deref()
    }

    /// Parsed path, when set.
    #[must_use]
    pub const fn path(&self) -> Option<&PathExpression> {
        self.path.as_ref()
    }

    /// Extra named fields.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_json(request: &CommandRequest) -> Value {
        serde_json::to_value(request).expect("serialise request")
    }

    #[test]
    fn bare_command_has_only_the_command_key() {
        let request = CommandRequest::new("list_buttons").expect("valid command");
        assert_eq!(to_json(&request), json!({ "command": "list_buttons" }));
    }

    #[test]
    fn generic_call_carries_arguments_verbatim() {
        let request = CommandRequest::generic_call(["safe_command_router", "log", "hi"]);
        assert_eq!(
            to_json(&request),
            json!({ "command": "call", "args": ["safe_command_router", "log", "hi"] })
        );
    }

    #[test]
    fn path_and_fields_serialise_alongside_command() {
        let request = CommandRequest::new("get_game_state")
            .expect("valid command")
            .with_path("GAME.hands[1].id")
            .with_field("index", 3);
        assert_eq!(
            to_json(&request),
            json!({
                "command": "get_game_state",
                "path": ["GAME", "hands", 1, "id"],
                "index": 3
            })
        );
    }

    #[test]
    fn empty_path_expression_still_sends_path() {
        let request = CommandRequest::new("list_keys")
            .expect("valid command")
            .with_path("");
        assert_eq!(to_json(&request), json!({ "command": "list_keys", "path": [] }));
    }

    #[test]
    fn reserved_fields_do_not_override_request_keys() {
        let mut extra = Map::new();
        extra.insert("command".to_owned(), json!("quit"));
        extra.insert("path".to_owned(), json!(["x"]));
        extra.insert("text".to_owned(), json!("PLAY"));
        let request = CommandRequest::new("click_by_text")
            .expect("valid command")
            .with_fields(extra);
        assert_eq!(
            to_json(&request),
            json!({ "command": "click_by_text", "text": "PLAY" })
        );
    }

    #[test]
    fn blank_command_is_rejected() {
        assert_eq!(
            CommandRequest::new("   ").expect_err("blank command"),
            RequestError::EmptyCommand
        );
    }
}
