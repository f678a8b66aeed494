//! Lock service abstraction.

use async_trait::async_trait;
use common::{HolderId, SeatId, ShowtimeId};

use crate::error::LockError;

/// Short-lived, TTL-bounded locks over seats of a showtime.
///
/// Acquisition is all-or-nothing: if any requested seat is already locked,
/// no lock is taken at all. Holding a lock grants the right to run the
/// reservation workflow for those seats; the TTL bounds how long a crashed
/// workflow can keep others out.
#[async_trait]
pub trait SeatLockService: Send + Sync {
    /// Attempts to lock every seat in `seat_ids` for `holder_id`.
    ///
    /// Returns `Ok(false)` when any seat is already locked, in which case
    /// nothing was acquired. Errors are reserved for backend failures.
    async fn try_lock_seats(
        &self,
        showtime_id: ShowtimeId,
        seat_ids: &[SeatId],
        holder_id: HolderId,
    ) -> Result<bool, LockError>;

    /// Releases the locks on the given seats.
    ///
    /// Idempotent; releasing a seat that is not locked is a no-op. Callers
    /// release eagerly on both success and failure paths so that seats come
    /// back into contention before the TTL would free them.
    async fn release_locks(
        &self,
        showtime_id: ShowtimeId,
        seat_ids: &[SeatId],
    ) -> Result<(), LockError>;
}
