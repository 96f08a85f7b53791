//! The chat backend's line protocol.
//!
//! Every line is `<tag>:<payload>`:
//!
//! | tag | payload | meaning |
//! |-----|---------|---------|
//! | `0` | JSON string (raw text accepted) | text delta |
//! | `9` | `{"toolCallId"?, "toolName", "args"}` | tool call announced |
//! | `a` | `{"result": ...}` | tool result |
//!
//! Other tags are reserved and ignored. Parsing never fails outright: bad
//! payloads degrade to a fallback frame so the stream keeps going.

use serde_json::Value;

pub const TAG_TEXT: &str = "0";
pub const TAG_TOOL_CALL: &str = "9";
pub const TAG_TOOL_RESULT: &str = "a";

/// One classified protocol line.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Text to append to the turn.
    TextDelta(String),

    /// A new tool invocation. `id` is `None` when the backend omitted it.
    ToolCall {
        id: Option<String>,
        name: String,
        arguments: serde_json::Value,
    },

    /// The `result` field of a tool result payload, if it had one.
    ToolResult(Option<serde_json::Value>),

    /// A tool-call line whose payload could not be parsed.
    MalformedToolCall { raw: String, reason: String },

    /// Unknown tag or a line without a tag separator.
    Ignored,
}

/// A usable call id: a non-empty string, or a number in its decimal form.
/// Anything else leaves the id to be synthesized.
fn tool_call_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Tool names are displayed, never dispatched on, so any value is kept.
fn tool_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Classify a single (non-blank) line.
pub fn parse_line(line: &str) -> Frame {
    let Some((tag, payload)) = line.split_once(':') else {
        return Frame::Ignored;
    };

    match tag {
        TAG_TEXT => Frame::TextDelta(
            serde_json::from_str::<String>(payload).unwrap_or_else(|_| payload.to_string()),
        ),
        TAG_TOOL_CALL => match serde_json::from_str::<Value>(payload) {
            Ok(Value::Object(call)) => Frame::ToolCall {
                id: call.get("toolCallId").and_then(tool_call_id),
                name: call.get("toolName").map(tool_name).unwrap_or_default(),
                arguments: call.get("args").cloned().unwrap_or(Value::Null),
            },
            Ok(_) => Frame::MalformedToolCall {
                raw: payload.to_string(),
                reason: "tool call payload is not a JSON object".into(),
            },
            Err(e) => Frame::MalformedToolCall {
                raw: payload.to_string(),
                reason: e.to_string(),
            },
        },
        TAG_TOOL_RESULT => match serde_json::from_str::<serde_json::Value>(payload) {
            Ok(value) => Frame::ToolResult(value.get("result").cloned()),
            Err(_) => Frame::ToolResult(Some(parse_error_result(payload))),
        },
        _ => Frame::Ignored,
    }
}

/// Stand-in result for a tool-result line that is not valid JSON. Large SQL
/// payloads are the usual culprit, so the raw text is kept.
pub fn parse_error_result(raw: &str) -> serde_json::Value {
    serde_json::json!({
        "success": false,
        "error": "ParseError",
        "raw": raw,
    })
}
