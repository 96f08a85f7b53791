//! Chat transport traits — the abstraction over the streaming chat backend.
//!
//! A [`ChatTransport`] sends a conversation to the backend and hands back a
//! [`ResponseBody`]: the raw byte stream of the line-tagged protocol. The
//! body is a scoped resource; whoever consumes it must call
//! [`ResponseBody::release`] on every exit path.
//!
//! Implementations: HTTP (reqwest), scripted bodies in tests.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::message::{ChatMessage, OutboundMessage};
use crate::model::SupportedModel;

/// The JSON document posted to the chat backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<OutboundMessage>,
    pub model: SupportedModel,
}

impl ChatRequest {
    /// Build a request from conversation history, keeping only text content.
    pub fn from_history(history: &[ChatMessage], model: SupportedModel) -> Self {
        Self {
            messages: history.iter().map(ChatMessage::to_outbound).collect(),
            model,
        }
    }
}

/// A streamed response body.
#[async_trait]
pub trait ResponseBody: Send {
    /// Read the next chunk of bytes. `None` means end of stream.
    async fn next_chunk(&mut self) -> Option<Result<Bytes, TransportError>>;

    /// Release the underlying stream. Releasing twice reports
    /// [`TransportError::AlreadyReleased`].
    fn release(&mut self) -> Result<(), TransportError>;
}

/// The core ChatTransport trait.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// A human-readable name for this transport (e.g. "http").
    fn name(&self) -> &str;

    /// Send the request. A non-success response is an error; on success the
    /// body is ready to be read.
    async fn open(&self, request: ChatRequest) -> Result<Box<dyn ResponseBody>, TransportError>;
}
