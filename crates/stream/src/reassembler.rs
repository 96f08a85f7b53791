//! Folding protocol frames into the state of one assistant turn.
//!
//! The reassembler owns the turn state for exactly one request. It is fed
//! raw body chunks and hands back a [`Snapshot`] for every line that changed
//! the turn. It never emits the completion snapshot by itself; the request
//! runner decides when the turn is over.

use chrono::Utc;
use crownwell_core::snapshot::{Snapshot, SnapshotStatus, ToolCall};
use tracing::{debug, trace, warn};

use crate::decoder::LineDecoder;
use crate::protocol::{self, Frame};

/// Turn state for a single in-flight request.
#[derive(Debug, Default)]
pub struct Reassembler {
    decoder: LineDecoder,
    text: String,
    tool_calls: Vec<ToolCall>,
    /// Counter for ids synthesized when the backend omits one.
    synthesized_ids: u64,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body chunk; returns one snapshot per line that changed state.
    pub fn push_chunk(&mut self, bytes: &[u8]) -> Vec<Snapshot> {
        let lines = self.decoder.push(bytes);
        lines.iter().filter_map(|line| self.apply_line(line)).collect()
    }

    /// Flush the decoder at end of stream (an unterminated final line is
    /// still parsed).
    pub fn finish(&mut self) -> Vec<Snapshot> {
        let lines = self.decoder.finish();
        lines.iter().filter_map(|line| self.apply_line(line)).collect()
    }

    /// Parse and apply a single line.
    pub fn apply_line(&mut self, line: &str) -> Option<Snapshot> {
        self.apply(protocol::parse_line(line))
    }

    /// Apply a frame. Returns the resulting running snapshot, or `None` if
    /// the frame left the turn unchanged.
    pub fn apply(&mut self, frame: Frame) -> Option<Snapshot> {
        match frame {
            Frame::TextDelta(delta) => {
                self.text.push_str(&delta);
            }
            Frame::ToolCall {
                id,
                name,
                arguments,
            } => {
                let id = id.unwrap_or_else(|| self.synthesize_id());
                debug!(tool = %name, id = %id, "Tool call detected");
                self.tool_calls.push(ToolCall::pending(id, name, arguments));
            }
            Frame::ToolResult(result) => {
                // Results arrive in call order, so the oldest pending call is
                // the one being answered.
                let target = match self.tool_calls.iter().position(ToolCall::is_pending) {
                    Some(idx) => Some(idx),
                    None => self.tool_calls.len().checked_sub(1),
                };
                let Some(idx) = target else {
                    warn!("Tool result received before any tool call; dropping it");
                    return None;
                };
                let call = &mut self.tool_calls[idx];
                if !call.is_pending() {
                    warn!(tool = %call.name, id = %call.id, "No pending tool call; attaching result to the latest one");
                }
                call.resolve(result);
                debug!(tool = %call.name, id = %call.id, "Tool result matched");
            }
            Frame::MalformedToolCall { raw, reason } => {
                warn!(%reason, payload = %raw, "Skipping malformed tool-call line");
                return None;
            }
            Frame::Ignored => {
                trace!("Ignoring line with unhandled tag");
                return None;
            }
        }
        Some(self.snapshot(SnapshotStatus::Running))
    }

    /// Copy out the current turn state.
    pub fn snapshot(&self, status: SnapshotStatus) -> Snapshot {
        Snapshot::build(&self.text, &self.tool_calls, status)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    fn synthesize_id(&mut self) -> String {
        let id = format!("tool-{}-{}", Utc::now().timestamp_millis(), self.synthesized_ids);
        self.synthesized_ids += 1;
        id
    }
}
