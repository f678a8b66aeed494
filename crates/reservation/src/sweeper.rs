//! Background reclamation of abandoned reservations.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use common::Clock;
use domain::{DomainEvent, Reservation, SeatStatus};
use metrics::counter;
use store::{ReservationStore, StagedEvent, StoreError};
use tracing::{info, warn};

/// Expires pending reservations whose holders never completed the purchase,
/// returning their seats to the available pool.
///
/// Each reclamation is one atomic commit: the reservation flips to Expired,
/// its seats are released, and one batched ReservationExpired event is
/// staged. A seat that is no longer held by the reservation's holder is
/// skipped; a fresh reservation legitimately took it over after the stale
/// hold's lock expired, and releasing it would clobber the newcomer.
pub struct ReclamationSweeper<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    threshold: Duration,
}

impl<S> ReclamationSweeper<S>
where
    S: ReservationStore,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, threshold: Duration) -> Self {
        Self {
            store,
            clock,
            threshold,
        }
    }

    /// Runs one reclamation pass and returns how many reservations expired.
    ///
    /// A failure on one reservation is logged and does not stop the pass;
    /// the reservation stays pending and is retried on the next tick.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_once(&self) -> Result<usize, StoreError> {
        let cutoff = self.clock.now() - self.threshold;
        let overdue = self.store.expired_reservations(cutoff).await?;
        let mut reclaimed = 0;

        for reservation in overdue {
            let reservation_id = reservation.id();
            match self.reclaim(reservation).await {
                Ok(released) => {
                    reclaimed += 1;
                    counter!("reservations_expired_total").increment(1);
                    info!(%reservation_id, released, "reclaimed abandoned reservation");
                }
                Err(e) => {
                    warn!(%reservation_id, error = %e, "reclamation failed, will retry");
                }
            }
        }

        Ok(reclaimed)
    }

    /// Expires one reservation, returning how many of its seats it released.
    async fn reclaim(&self, mut reservation: Reservation) -> Result<usize, StoreError> {
        let showtime_id = reservation.showtime_id();
        let holder_id = reservation.holder_id();
        let seat_ids = reservation.seat_ids();

        reservation
            .mark_expired()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let seats = self.store.seats_by_id(showtime_id, &seat_ids).await?;
        let mut releasing = Vec::new();
        for mut seat in seats {
            // Only release what this reservation still holds.
            if seat.status() == SeatStatus::Reserved && seat.reserver_id() == Some(holder_id) {
                seat.release();
                releasing.push(seat);
            }
        }

        let staged = if releasing.is_empty() {
            None
        } else {
            let released_ids = releasing.iter().map(|s| s.id()).collect();
            let event =
                DomainEvent::reservation_expired(reservation.id(), showtime_id, released_ids);
            Some(StagedEvent::stage(&event, self.clock.now())?)
        };

        let released = releasing.len();
        self.store
            .commit_expiry(&reservation, &releasing, staged)
            .await?;
        Ok(released)
    }

    /// Runs the sweep loop forever at the given interval.
    pub async fn run(self, interval: StdDuration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep_once().await {
                warn!(error = %e, "sweep pass failed");
            }
        }
    }
}
