//! Records store implementations for Crownwell.
//!
//! All stores implement the `crownwell_core::RecordStore` trait.
//! The REST store talks to a PostgREST-style API; the in-memory store backs
//! tests and offline demos.

pub mod in_memory;
pub mod rest;

pub use in_memory::InMemoryRecordStore;
pub use rest::RestRecordStore;
