//! Workflow errors.

use common::SeatId;
use seat_locks::LockError;
use store::StoreError;
use thiserror::Error;

/// Outcome taxonomy of the reserve workflow.
///
/// `Conflict` is retryable: either the lock gate turned the request away or
/// a concurrent commit won the version race. `AlreadySold` is permanent for
/// the seat and retrying cannot succeed.
#[derive(Debug, Error)]
pub enum ReserveError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("requested seats are contended, try again")]
    Conflict,

    #[error("seat {0} is already sold")]
    AlreadySold(SeatId),

    #[error("lock backend error: {0}")]
    LockStore(#[from] LockError),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ReserveError {
    fn from(e: StoreError) -> Self {
        match e {
            // A losing version race means somebody else committed first,
            // which callers should see as the same retryable conflict the
            // lock gate reports.
            StoreError::VersionConflict { .. } => ReserveError::Conflict,
            other => ReserveError::Store(other),
        }
    }
}
