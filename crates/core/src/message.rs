//! Chat message types.
//!
//! A [`ChatMessage`] is one turn in the conversation history as the front end
//! holds it: a role plus content parts (text and tool calls). Only the text
//! parts travel back to the backend, flattened into an [`OutboundMessage`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::snapshot::{ContentPart, Snapshot};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
}

/// A single turn in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// Content parts in display order
    pub parts: Vec<ContentPart>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn with_parts(role: Role, parts: Vec<ContentPart>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            parts,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_parts(Role::User, vec![ContentPart::Text { text: text.into() }])
    }

    /// Create a new system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_parts(Role::System, vec![ContentPart::Text { text: text.into() }])
    }

    /// Create an assistant message from the parts of a streamed snapshot.
    pub fn assistant_from(snapshot: &Snapshot) -> Self {
        Self::with_parts(Role::Assistant, snapshot.parts.clone())
    }

    /// Concatenation of every text part; tool-call parts are dropped.
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::ToolCall(_) => None,
            })
            .collect()
    }

    /// Flatten into the `{role, content}` pair the chat backend expects.
    pub fn to_outbound(&self) -> OutboundMessage {
        OutboundMessage {
            role: self.role,
            content: self.text_content(),
        }
    }
}

/// A history entry as sent to the chat backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub role: Role,
    pub content: String,
}
