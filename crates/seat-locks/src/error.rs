//! Lock service errors.

use thiserror::Error;

/// Errors from the lock backend.
///
/// Contention is not an error: a failed acquisition is reported as a plain
/// `false` from the service. This type covers only backend unavailability.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("lock backend unavailable: {0}")]
    Unavailable(String),
}
