//! Exactly-once delivery of finished assistant output to the presentation
//! layer.
//!
//! Re-rendering a completed turn must not re-announce its text or re-ingest
//! its tool data. The tracker remembers what has been handed out, keyed by
//! message id and tool-call id. It is an ordinary owned value: each chat
//! session holds its own, so concurrent sessions never share delivery state.

use std::collections::HashSet;

use crate::snapshot::Snapshot;

/// Something the presentation layer should act on once.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// The full text of a finished assistant message.
    AssistantText { message_id: String, text: String },
    /// The `data` field of a resolved tool call.
    ToolData {
        tool_call_id: String,
        tool_name: String,
        data: serde_json::Value,
    },
}

#[derive(Debug, Default)]
pub struct DeliveryTracker {
    delivered_messages: HashSet<String>,
    processed_tools: HashSet<String>,
}

impl DeliveryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the deliveries for a snapshot belonging to `message_id`.
    ///
    /// Intermediate snapshots yield nothing. A complete snapshot yields its
    /// text (if non-empty) the first time its message id is seen, and the
    /// `data` of each tool result the first time its tool-call id is seen.
    pub fn collect(&mut self, message_id: &str, snapshot: &Snapshot) -> Vec<Delivery> {
        let mut out = Vec::new();
        if !snapshot.is_complete() {
            return out;
        }

        let text = snapshot.text();
        if !text.is_empty() && self.delivered_messages.insert(message_id.to_string()) {
            out.push(Delivery::AssistantText {
                message_id: message_id.to_string(),
                text: text.to_string(),
            });
        }

        for call in snapshot.tool_calls() {
            if call.id.is_empty() {
                continue;
            }
            let Some(data) = call.result.as_ref().and_then(|r| r.get("data")) else {
                continue;
            };
            if data.is_null() || self.processed_tools.contains(&call.id) {
                continue;
            }
            self.processed_tools.insert(call.id.clone());
            out.push(Delivery::ToolData {
                tool_call_id: call.id.clone(),
                tool_name: if call.name.is_empty() {
                    "Tool Result".to_string()
                } else {
                    call.name.clone()
                },
                data: data.clone(),
            });
        }

        out
    }

    pub fn is_delivered(&self, message_id: &str) -> bool {
        self.delivered_messages.contains(message_id)
    }

    pub fn is_processed(&self, tool_call_id: &str) -> bool {
        self.processed_tools.contains(tool_call_id)
    }
}
