//! Snapshots of an assistant turn as it streams in.
//!
//! A [`Snapshot`] is a copy-out of the accumulated turn state at one instant:
//! an optional text part followed by every tool call seen so far, in the
//! order they were announced. The last snapshot of a request carries
//! [`SnapshotStatus::Complete`].

use serde::{Deserialize, Serialize};

/// Resolution state of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallState {
    /// Announced by the model, no result yet.
    Pending,
    /// A result has been attached.
    Complete,
}

/// A tool invocation announced by the model, with its eventual result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(rename = "toolCallId")]
    pub id: String,

    #[serde(rename = "toolName")]
    pub name: String,

    /// Opaque arguments as sent by the backend.
    #[serde(rename = "args", default)]
    pub arguments: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    pub state: ToolCallState,
}

impl ToolCall {
    pub fn pending(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            result: None,
            state: ToolCallState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == ToolCallState::Pending
    }

    /// Attach a result and mark the call complete.
    pub fn resolve(&mut self, result: Option<serde_json::Value>) {
        self.result = result;
        self.state = ToolCallState::Complete;
    }

    /// Arguments rendered as compact JSON text.
    pub fn arguments_text(&self) -> String {
        self.arguments.to_string()
    }
}

/// One part of a turn's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentPart {
    Text { text: String },
    ToolCall(ToolCall),
}

/// Whether a snapshot is intermediate or terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    #[default]
    Running,
    Complete,
}

/// Immutable projection of a turn at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub parts: Vec<ContentPart>,
    pub status: SnapshotStatus,
}

impl Snapshot {
    /// Build a snapshot from accumulated text and tool calls.
    ///
    /// The text part is only included when non-empty, and always precedes
    /// the tool-call parts.
    pub fn build(text: &str, tool_calls: &[ToolCall], status: SnapshotStatus) -> Self {
        let mut parts = Vec::with_capacity(tool_calls.len() + 1);
        if !text.is_empty() {
            parts.push(ContentPart::Text {
                text: text.to_string(),
            });
        }
        parts.extend(tool_calls.iter().cloned().map(ContentPart::ToolCall));
        Self { parts, status }
    }

    pub fn is_complete(&self) -> bool {
        self.status == SnapshotStatus::Complete
    }

    /// The accumulated text, or `""` when nothing has been streamed yet.
    pub fn text(&self) -> &str {
        self.parts
            .iter()
            .find_map(|p| match p {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::ToolCall(_) => None,
            })
            .unwrap_or("")
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.parts.iter().filter_map(|p| match p {
            ContentPart::ToolCall(tc) => Some(tc),
            ContentPart::Text { .. } => None,
        })
    }
}
