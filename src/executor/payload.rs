//! Tool-result envelopes and tool-argument parsing.
//!
//! Every tool turn sent back to the endpoint is one of two envelopes:
//! `{"ok":true,...}` or `{"ok":false,"error":{"type":...,"message":...}}`.
//! Argument problems never abort a run; they come back as a [`ToolError`]
//! which the caller turns into the error envelope.
use std::io;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::executor::text_input::retain_ascii;

pub const COORD_MIN: f64 = 0.0;
pub const COORD_MAX: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    InvalidArguments,
    TooManyToolCalls,
    UnknownTool,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::InvalidArguments => "invalid_arguments",
            ToolErrorKind::TooManyToolCalls => "too_many_tool_calls",
            ToolErrorKind::UnknownTool => "unknown_tool",
        }
    }

    /// Stand-in message for an error reported without one.
    pub fn describe(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

/// A step-local failure reported to the endpoint as a tool result.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            kind.describe()
        } else {
            message
        };
        Self { kind, message }
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidArguments, message)
    }

    pub fn too_many_tool_calls() -> Self {
        Self::new(
            ToolErrorKind::TooManyToolCalls,
            "only one tool call per response allowed",
        )
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(ToolErrorKind::UnknownTool, name)
    }

    pub fn to_envelope(&self) -> String {
        encode_error(self.kind, &self.message)
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody<'a>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    message: &'a str,
}

/// `{"ok":true, ...extra}`. An `ok` key inside `extra` is ignored.
pub fn encode_success(extra: Option<Map<String, Value>>) -> String {
    let mut extra = extra.unwrap_or_default();
    extra.remove("ok");
    to_ascii_json(&Envelope {
        ok: true,
        error: None,
        extra,
    })
}

/// `{"ok":false,"error":{"type":...,"message":...}}`. A blank message is
/// replaced by a description of `kind`.
pub fn encode_error(kind: ToolErrorKind, message: &str) -> String {
    let fallback;
    let message = if message.trim().is_empty() {
        fallback = kind.describe();
        fallback.as_str()
    } else {
        message
    };
    to_ascii_json(&Envelope {
        ok: false,
        error: Some(ErrorBody {
            kind: kind.as_str(),
            message,
        }),
        extra: Map::new(),
    })
}

/// Compact JSON with every non-ASCII code point written as a `\uXXXX` escape.
fn to_ascii_json<T: Serialize>(value: &T) -> String {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, AsciiFormatter);
    if let Err(e) = value.serialize(&mut ser) {
        tracing::error!(error = %e, "envelope serialization failed");
        return r#"{"ok":false,"error":{"type":"internal","message":"envelope serialization failed"}}"#
            .to_string();
    }
    // Only ASCII bytes are ever written.
    String::from_utf8_lossy(&out).into_owned()
}

struct AsciiFormatter;

impl serde_json::ser::Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut buf = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut buf) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Decodes the raw `function.arguments` value into a JSON object.
pub fn parse_arguments(raw: Option<&Value>) -> Result<Map<String, Value>, ToolError> {
    let text = match raw {
        None | Some(Value::Null) => return Ok(Map::new()),
        Some(Value::String(s)) => s,
        Some(_) => {
            return Err(ToolError::invalid_arguments(
                "arguments must be a JSON string",
            ))
        }
    };
    if text.is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ToolError::invalid_arguments(
            "arguments must decode to an object",
        )),
        Err(e) => Err(ToolError::invalid_arguments(format!(
            "JSON decode error: {e}"
        ))),
    }
}

/// Normalized `(x, y)` clamped into `[0, 1000]`.
pub fn parse_coordinates(raw: Option<&Value>) -> Result<(f64, f64), ToolError> {
    let args = parse_arguments(raw)?;
    let (Some(x), Some(y)) = (args.get("x"), args.get("y")) else {
        return Err(ToolError::invalid_arguments("missing x or y"));
    };
    match (as_number(x), as_number(y)) {
        (Some(x), Some(y)) => Ok((clamp_coord(x), clamp_coord(y))),
        _ => Err(ToolError::invalid_arguments("x and y must be numbers")),
    }
}

/// The `text` argument, reduced to ASCII. Missing or null text is `""`.
pub fn parse_text(raw: Option<&Value>) -> Result<String, ToolError> {
    let args = parse_arguments(raw)?;
    let text = match args.get("text") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    Ok(retain_ascii(&text))
}

fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    (!n.is_nan()).then_some(n)
}

fn clamp_coord(v: f64) -> f64 {
    v.clamp(COORD_MIN, COORD_MAX)
}
