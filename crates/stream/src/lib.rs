//! Streaming chat for Crownwell.
//!
//! The chat backend answers with a newline-delimited, tag-prefixed protocol.
//! This crate turns that byte stream into a sequence of [`Snapshot`]s:
//!
//! - [`decoder`] — incremental UTF-8 decoding and line splitting
//! - [`protocol`] — classifying one line into a [`protocol::Frame`]
//! - [`reassembler`] — folding frames into turn state
//! - [`http`] — the reqwest-backed [`ChatTransport`]
//! - [`runner`] — one request end to end, with cancellation
//!
//! [`Snapshot`]: crownwell_core::Snapshot
//! [`ChatTransport`]: crownwell_core::ChatTransport

pub mod decoder;
pub mod http;
pub mod protocol;
pub mod reassembler;
pub mod runner;

pub use decoder::LineDecoder;
pub use http::HttpChatTransport;
pub use protocol::Frame;
pub use reassembler::Reassembler;
pub use runner::{Envelope, RequestState, SnapshotStream, StreamReassembler};
