//! Store error types.

use common::SeatId;
use thiserror::Error;

/// Errors that can occur when interacting with the authoritative store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A versioned write lost a race: the row changed since it was loaded.
    /// Retryable by the caller after reloading.
    #[error("version conflict on seat {seat_id}: expected version {expected}")]
    VersionConflict { seat_id: SeatId, expected: i64 },

    /// A write referenced a seat that does not exist.
    #[error("seat not found: {0}")]
    SeatNotFound(SeatId),

    /// The store backend rejected the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
