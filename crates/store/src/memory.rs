//! In-memory store implementation for testing and the default wiring.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{EventId, ReservationId, SeatId, ShowtimeId};
use domain::{Reservation, ReservationStatus, Seat, Showtime};
use tokio::sync::RwLock;

use crate::outbox::StagedEvent;
use crate::store::ReservationStore;
use crate::{Result, StoreError};

#[derive(Default)]
struct Inner {
    showtimes: HashMap<ShowtimeId, Showtime>,
    seats: HashMap<SeatId, Seat>,
    reservations: HashMap<ReservationId, Reservation>,
    outbox: Vec<StagedEvent>,
    fail_on_commit: bool,
}

impl Inner {
    /// Applies versioned seat writes, bumping each version by one.
    ///
    /// Returns an error without modifying anything when any check fails;
    /// the caller holds the write lock, so the whole batch is atomic.
    fn check_and_apply_seats(&mut self, seats: &[Seat]) -> Result<()> {
        for seat in seats {
            let stored = self
                .seats
                .get(&seat.id())
                .ok_or(StoreError::SeatNotFound(seat.id()))?;
            if stored.version() != seat.version() {
                return Err(StoreError::VersionConflict {
                    seat_id: seat.id(),
                    expected: seat.version(),
                });
            }
        }

        for seat in seats {
            let bumped = Seat::from_parts(
                seat.id(),
                seat.showtime_id(),
                seat.row().to_string(),
                seat.number(),
                seat.status(),
                seat.reserver_id(),
                seat.version() + 1,
            );
            self.seats.insert(seat.id(), bumped);
        }

        Ok(())
    }
}

/// In-memory authoritative store.
///
/// A single write lock per commit makes each commit atomic; version checks
/// simulate the conditional updates of the Postgres implementation.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next commits fail with a backend error. Test hook.
    pub async fn set_fail_on_commit(&self, fail: bool) {
        self.inner.write().await.fail_on_commit = fail;
    }

    /// Returns the total number of staged events, delivered or not.
    pub async fn outbox_len(&self) -> usize {
        self.inner.read().await.outbox.len()
    }

    /// Returns the number of reservations ever committed.
    pub async fn reservation_count(&self) -> usize {
        self.inner.read().await.reservations.len()
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn create_showtime(&self, showtime: Showtime, seats: Vec<Seat>) -> Result<()> {
        let mut inner = self.inner.write().await;
        for seat in seats {
            inner.seats.insert(seat.id(), seat);
        }
        inner.showtimes.insert(showtime.id, showtime);
        Ok(())
    }

    async fn showtime(&self, id: ShowtimeId) -> Result<Option<Showtime>> {
        Ok(self.inner.read().await.showtimes.get(&id).cloned())
    }

    async fn seats_for_showtime(&self, showtime_id: ShowtimeId) -> Result<Vec<Seat>> {
        let inner = self.inner.read().await;
        let mut seats: Vec<Seat> = inner
            .seats
            .values()
            .filter(|s| s.showtime_id() == showtime_id)
            .cloned()
            .collect();
        seats.sort_by(|a, b| (a.row(), a.number()).cmp(&(b.row(), b.number())));
        Ok(seats)
    }

    async fn seats_by_id(&self, showtime_id: ShowtimeId, seat_ids: &[SeatId]) -> Result<Vec<Seat>> {
        let inner = self.inner.read().await;
        Ok(seat_ids
            .iter()
            .filter_map(|id| inner.seats.get(id))
            .filter(|s| s.showtime_id() == showtime_id)
            .cloned()
            .collect())
    }

    async fn reservation(&self, id: ReservationId) -> Result<Option<Reservation>> {
        Ok(self.inner.read().await.reservations.get(&id).cloned())
    }

    async fn commit_reservation(
        &self,
        reservation: &Reservation,
        seats: &[Seat],
        staged: StagedEvent,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;

        if inner.fail_on_commit {
            return Err(StoreError::Unavailable("injected commit failure".to_string()));
        }

        inner.check_and_apply_seats(seats)?;
        inner
            .reservations
            .insert(reservation.id(), reservation.clone());
        inner.outbox.push(staged);
        Ok(())
    }

    async fn expired_reservations(&self, cutoff: DateTime<Utc>) -> Result<Vec<Reservation>> {
        let inner = self.inner.read().await;
        let mut expired: Vec<Reservation> = inner
            .reservations
            .values()
            .filter(|r| r.status() == ReservationStatus::Pending && r.created_at() < cutoff)
            .cloned()
            .collect();
        expired.sort_by_key(Reservation::created_at);
        Ok(expired)
    }

    async fn commit_expiry(
        &self,
        reservation: &Reservation,
        seats: &[Seat],
        staged: Option<StagedEvent>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;

        if inner.fail_on_commit {
            return Err(StoreError::Unavailable("injected commit failure".to_string()));
        }

        inner.check_and_apply_seats(seats)?;
        inner
            .reservations
            .insert(reservation.id(), reservation.clone());
        if let Some(staged) = staged {
            inner.outbox.push(staged);
        }
        Ok(())
    }

    async fn undelivered_events(&self, limit: usize) -> Result<Vec<StagedEvent>> {
        let inner = self.inner.read().await;
        Ok(inner
            .outbox
            .iter()
            .filter(|e| !e.is_delivered())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_delivered(&self, event_id: EventId, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(event) = inner.outbox.iter_mut().find(|e| e.event_id == event_id) {
            event.delivered_at = Some(at);
        }
        Ok(())
    }
}
