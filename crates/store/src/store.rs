//! Core trait for authoritative store implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{EventId, ReservationId, SeatId, ShowtimeId};
use domain::{Reservation, Seat, Showtime};

use crate::outbox::StagedEvent;
use crate::Result;

/// The single source of truth for seat and reservation state.
///
/// All implementations must be thread-safe. The two `commit_*` operations are
/// the only ways to mutate seats or reservations, and both are atomic: either
/// every write (including the staged event) lands, or none do. Seat writes
/// are conditional on the version the entity was loaded at; a lost race is
/// reported as [`StoreError::VersionConflict`](crate::StoreError::VersionConflict).
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Creates a showtime and its seat catalog.
    async fn create_showtime(&self, showtime: Showtime, seats: Vec<Seat>) -> Result<()>;

    /// Loads a showtime by id.
    async fn showtime(&self, id: ShowtimeId) -> Result<Option<Showtime>>;

    /// Loads the full seat list of a showtime.
    async fn seats_for_showtime(&self, showtime_id: ShowtimeId) -> Result<Vec<Seat>>;

    /// Loads seats by id, scoped to a showtime.
    ///
    /// An id that resolves to a seat of a different showtime is treated as
    /// not found; callers detect unknown or foreign ids by comparing the
    /// returned count against the requested count.
    async fn seats_by_id(&self, showtime_id: ShowtimeId, seat_ids: &[SeatId]) -> Result<Vec<Seat>>;

    /// Loads a reservation by id.
    async fn reservation(&self, id: ReservationId) -> Result<Option<Reservation>>;

    /// Atomically persists a new reservation, its seat mutations and the
    /// staged event describing them.
    async fn commit_reservation(
        &self,
        reservation: &Reservation,
        seats: &[Seat],
        staged: StagedEvent,
    ) -> Result<()>;

    /// Finds pending reservations created strictly before the cutoff.
    async fn expired_reservations(&self, cutoff: DateTime<Utc>) -> Result<Vec<Reservation>>;

    /// Atomically persists a reservation expiry: the status change, the seat
    /// releases and (when any seat was released) the staged expiry event.
    async fn commit_expiry(
        &self,
        reservation: &Reservation,
        seats: &[Seat],
        staged: Option<StagedEvent>,
    ) -> Result<()>;

    /// Returns undelivered staged events in insertion order, up to `limit`.
    async fn undelivered_events(&self, limit: usize) -> Result<Vec<StagedEvent>>;

    /// Marks a staged event delivered.
    async fn mark_delivered(&self, event_id: EventId, at: DateTime<Utc>) -> Result<()>;
}
