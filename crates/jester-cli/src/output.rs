//! Rendering of game responses for the operator.
//!
//! Human output pretty-prints JSON and shows text verbatim; JSON output
//! writes one compact document per response so the client can be piped
//! into other tools.

use std::io::{self, Write};

use clap::ValueEnum;
use jester_protocol::ResponseValue;
use serde_json::Value;

/// Output format selection for game responses.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Selects `human` for terminal output and `json` for redirected output.
    Auto,
    /// Always render human-readable output.
    Human,
    /// Always emit one compact JSON document per response.
    Json,
}

/// Output format after resolving `auto` based on TTY detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolvedOutputFormat {
    /// Pretty-printed JSON and verbatim text.
    Human,
    /// Compact JSON documents.
    Json,
}

impl OutputFormat {
    /// Resolves the output format based on whether stdout is a terminal.
    #[must_use]
    pub const fn resolve(self, stdout_is_terminal: bool) -> ResolvedOutputFormat {
        match self {
            Self::Auto => {
                if stdout_is_terminal {
                    ResolvedOutputFormat::Human
                } else {
                    ResolvedOutputFormat::Json
                }
            }
            Self::Human => ResolvedOutputFormat::Human,
            Self::Json => ResolvedOutputFormat::Json,
        }
    }
}

/// Writes a game response in the requested format.
pub(crate) fn render_response<W>(
    out: &mut W,
    format: ResolvedOutputFormat,
    response: &ResponseValue,
) -> io::Result<()>
where
    W: Write + ?Sized,
{
    match (format, response) {
        (ResolvedOutputFormat::Human, ResponseValue::Json(value)) => {
            let pretty = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
            writeln!(out, "Game's response:")?;
            writeln!(out, "{pretty}")?;
        }
        (ResolvedOutputFormat::Human, ResponseValue::Text(text)) => {
            writeln!(out, "Game's response: {text}")?;
        }
        (ResolvedOutputFormat::Json, ResponseValue::Json(value)) => {
            serde_json::to_writer(&mut *out, value).map_err(io::Error::other)?;
            writeln!(out)?;
        }
        (ResolvedOutputFormat::Json, ResponseValue::Text(text)) => {
            serde_json::to_writer(&mut *out, text).map_err(io::Error::other)?;
            writeln!(out)?;
        }
    }
    out.flush()
}

/// Writes the shape of `value`: object keys with the type of each value,
/// and for arrays their length and the shape of the first element.
pub(crate) fn render_structure<W>(out: &mut W, value: &Value) -> io::Result<()>
where
    W: Write + ?Sized,
{
    match value {
        Value::Object(_) | Value::Array(_) => write_structure(out, value, 0)?,
        scalar => writeln!(out, "({})", type_name(scalar))?,
    }
    out.flush()
}

fn write_structure<W>(out: &mut W, value: &Value, depth: usize) -> io::Result<()>
where
    W: Write + ?Sized,
{
    let indent = "  ".repeat(depth);
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                writeln!(out, "{indent}- {key}: ({})", type_name(child))?;
                if matches!(child, Value::Object(_) | Value::Array(_)) {
                    write_structure(out, child, depth + 1)?;
                }
            }
        }
        Value::Array(items) => match items.first() {
            Some(first) => {
                writeln!(
                    out,
                    "{indent}[array of {} items, first item is {}]",
                    items.len(),
                    with_article(type_name(first))
                )?;
                write_structure(out, first, depth + 1)?;
            }
            None => writeln!(out, "{indent}[empty array]")?,
        },
        _ => {}
    }
    Ok(())
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn with_article(noun: &str) -> String {
    let article = if noun.starts_with(['a', 'e', 'i', 'o', 'u']) {
        "an"
    } else {
        "a"
    };
    format!("{article} {noun}")
}
