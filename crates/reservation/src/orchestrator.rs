//! The gated reserve workflow.

use std::collections::HashSet;
use std::sync::Arc;

use common::{Clock, HolderId, ReservationId, SeatId, ShowtimeId};
use domain::{DomainError, DomainEvent, Reservation, ReservationItem};
use metrics::{counter, histogram};
use seat_locks::SeatLockService;
use serde::Serialize;
use store::{ReservationStore, StagedEvent, StoreError};
use tracing::{info, warn};

use crate::error::ReserveError;

/// What a successful reserve call hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationReceipt {
    pub reservation_id: ReservationId,
    pub showtime_id: ShowtimeId,
    pub holder_id: HolderId,
    pub items: Vec<ReservationItem>,
}

/// Drives the reserve protocol: gate, verify, mutate, stage, commit, and
/// compensate on failure.
///
/// The lock gate is the contention filter; the store's version check is the
/// correctness backstop for anything that slips past it. Locks acquired for
/// a successful reservation are left to expire by TTL, which keeps the seats
/// gated while the reservation is pending. Any failure after the gate
/// releases the full requested lock set before the error goes out.
///
/// A caller dropping the in-flight future before the commit simply abandons
/// the attempt; the locks it took expire on their own. After the commit the
/// reservation stands regardless of what the caller does.
pub struct ReservationOrchestrator<S, L> {
    store: Arc<S>,
    locks: Arc<L>,
    clock: Arc<dyn Clock>,
}

impl<S, L> ReservationOrchestrator<S, L>
where
    S: ReservationStore,
    L: SeatLockService,
{
    pub fn new(store: Arc<S>, locks: Arc<L>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            locks,
            clock,
        }
    }

    /// Reserves the given seats for the holder, all-or-nothing.
    #[tracing::instrument(skip(self), fields(seats = seat_ids.len()))]
    pub async fn reserve(
        &self,
        showtime_id: ShowtimeId,
        seat_ids: Vec<SeatId>,
        holder_id: HolderId,
    ) -> Result<ReservationReceipt, ReserveError> {
        counter!("reservations_attempted_total").increment(1);
        let started = std::time::Instant::now();

        if seat_ids.is_empty() {
            return Err(ReserveError::InvalidRequest(
                "no seats requested".to_string(),
            ));
        }
        let unique: HashSet<SeatId> = seat_ids.iter().copied().collect();
        if unique.len() != seat_ids.len() {
            return Err(ReserveError::InvalidRequest(
                "duplicate seats in request".to_string(),
            ));
        }

        // Gate. Nothing is held unless every seat locked.
        if !self
            .locks
            .try_lock_seats(showtime_id, &seat_ids, holder_id)
            .await?
        {
            counter!("reservations_rejected_total", "reason" => "contended").increment(1);
            return Err(ReserveError::Conflict);
        }

        match self.reserve_locked(showtime_id, &seat_ids, holder_id).await {
            Ok(receipt) => {
                histogram!("reservation_duration_seconds").record(started.elapsed().as_secs_f64());
                counter!("reservations_committed_total").increment(1);
                info!(
                    reservation_id = %receipt.reservation_id,
                    %holder_id,
                    "reservation committed"
                );
                Ok(receipt)
            }
            Err(e) => {
                // Compensation: give the seats back to contention right away
                // instead of waiting out the TTL. The original error wins
                // even if the release itself fails.
                if let Err(release_err) = self.locks.release_locks(showtime_id, &seat_ids).await {
                    warn!(error = %release_err, "failed to release locks after aborted reserve");
                }
                counter!("reservations_failed_total").increment(1);
                Err(e)
            }
        }
    }

    /// The post-gate half of the protocol. Runs with all locks held; the
    /// caller compensates when this returns an error.
    async fn reserve_locked(
        &self,
        showtime_id: ShowtimeId,
        seat_ids: &[SeatId],
        holder_id: HolderId,
    ) -> Result<ReservationReceipt, ReserveError> {
        // Verify against authoritative state. The lock gate knows nothing
        // about seats that do not exist or were sold long ago.
        let mut seats = self.store.seats_by_id(showtime_id, seat_ids).await?;
        if seats.len() != seat_ids.len() {
            return Err(ReserveError::InvalidRequest(
                "unknown seat for showtime".to_string(),
            ));
        }

        for seat in &mut seats {
            seat.reserve(holder_id).map_err(|e| match e {
                DomainError::AlreadySold { seat_id } => ReserveError::AlreadySold(seat_id),
                other => ReserveError::InvalidRequest(other.to_string()),
            })?;
        }

        let now = self.clock.now();
        let items: Vec<ReservationItem> = seats.iter().map(ReservationItem::from_seat).collect();
        let reservation = Reservation::new(showtime_id, holder_id, items, now)
            .map_err(|e| ReserveError::InvalidRequest(e.to_string()))?;

        let event = DomainEvent::seats_reserved(
            showtime_id,
            reservation.id(),
            holder_id,
            reservation.items(),
        );
        let staged = StagedEvent::stage(&event, now).map_err(StoreError::from)?;

        // One atomic commit: seats, reservation, staged event. The version
        // check turns any racing writer into a Conflict here.
        self.store
            .commit_reservation(&reservation, &seats, staged)
            .await?;

        Ok(ReservationReceipt {
            reservation_id: reservation.id(),
            showtime_id,
            holder_id,
            items: reservation.items().to_vec(),
        })
    }
}
