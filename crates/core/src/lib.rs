//! # Crownwell Core
//!
//! Domain types, traits, and error definitions for the Crownwell quality
//! assistant. This crate has **no I/O of its own** — it defines the model
//! that the streaming, records, and CLI crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping the chat backend or records store via configuration
//! - Testing with scripted bodies and in-memory stores
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod model;
pub mod snapshot;
pub mod transport;
pub mod records;
pub mod delivery;

// Re-export key types at crate root for ergonomics
pub use error::{Error, RecordsError, Result, TransportError};
pub use message::{ChatMessage, OutboundMessage, Role};
pub use model::SupportedModel;
pub use snapshot::{ContentPart, Snapshot, SnapshotStatus, ToolCall, ToolCallState};
pub use transport::{ChatRequest, ChatTransport, ResponseBody};
pub use records::{Record, RecordKind, RecordPage, RecordQuery, RecordStore};
pub use delivery::{Delivery, DeliveryTracker};
