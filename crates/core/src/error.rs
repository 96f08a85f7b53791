//! Error types for the Crownwell domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator (chat transport, records store) has its own error enum.

use thiserror::Error;

/// The top-level error type for all Crownwell operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Chat transport errors ---
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // --- Records store errors ---
    #[error("Records error: {0}")]
    Records(#[from] RecordsError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the chat transport. Any of these ends a streaming request
/// without a completion snapshot.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Chat request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Response body already released")]
    AlreadyReleased,
}

#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("Records query failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed records response: {0}")]
    Decode(String),

    #[error("Record {id} not found in {table}")]
    NotFound { table: String, id: i64 },

    #[error("Invalid patch: {0}")]
    InvalidPatch(String),
}
