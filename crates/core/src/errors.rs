//! Shared error types for the mealtrack core crate.

use thiserror::Error;

/// Result type alias used across the core crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Local storage failure (disk, quota, corruption). Fatal to the
    /// attempted operation and surfaced directly to the caller.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Requested record does not exist locally.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input rejected before it reaches storage.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network/HTTP failure during a sync cycle. Absorbed into the sync
    /// run state rather than thrown at UI-facing callers.
    #[error("Sync transport error: {0}")]
    SyncTransport(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage-layer failure classification.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
