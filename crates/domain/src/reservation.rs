//! Reservation aggregate.

use chrono::{DateTime, Utc};
use common::{HolderId, ReservationId, SeatId, ShowtimeId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::seat::Seat;

/// The state of a reservation.
///
/// `Pending` is the only non-terminal state; `Confirmed`, `Expired` and
/// `Failed` admit no further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ReservationStatus {
    /// Created but not yet confirmed; subject to reclamation.
    #[default]
    Pending,

    /// The holder completed the purchase (terminal).
    Confirmed,

    /// Reclaimed by the sweeper after the commitment deadline (terminal).
    Expired,

    /// Abandoned by a failed workflow (terminal).
    Failed,
}

impl ReservationStatus {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReservationStatus::Pending)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "Pending",
            ReservationStatus::Confirmed => "Confirmed",
            ReservationStatus::Expired => "Expired",
            ReservationStatus::Failed => "Failed",
        }
    }

    /// Parses a status from its string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(ReservationStatus::Pending),
            "Confirmed" => Some(ReservationStatus::Confirmed),
            "Expired" => Some(ReservationStatus::Expired),
            "Failed" => Some(ReservationStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A seat snapshot held by a reservation.
///
/// Row and number are copied from the seat at creation time so the historical
/// record stays accurate even if the seat catalog changes later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationItem {
    pub seat_id: SeatId,
    pub row: String,
    pub number: i32,
}

impl ReservationItem {
    /// Snapshots a seat into a reservation item.
    pub fn from_seat(seat: &Seat) -> Self {
        Self {
            seat_id: seat.id(),
            row: seat.row().to_string(),
            number: seat.number(),
        }
    }
}

/// Aggregate root tying a holder to a set of seats for one showtime.
///
/// The item set is fixed at construction; only `status` ever changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    id: ReservationId,
    showtime_id: ShowtimeId,
    holder_id: HolderId,
    status: ReservationStatus,
    created_at: DateTime<Utc>,
    items: Vec<ReservationItem>,
}

impl Reservation {
    /// Creates a pending reservation over the given seat snapshots.
    pub fn new(
        showtime_id: ShowtimeId,
        holder_id: HolderId,
        items: Vec<ReservationItem>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::EmptyReservation);
        }

        Ok(Self {
            id: ReservationId::new(),
            showtime_id,
            holder_id,
            status: ReservationStatus::Pending,
            created_at,
            items,
        })
    }

    /// Rehydrates a reservation from stored fields.
    pub fn from_parts(
        id: ReservationId,
        showtime_id: ShowtimeId,
        holder_id: HolderId,
        status: ReservationStatus,
        created_at: DateTime<Utc>,
        items: Vec<ReservationItem>,
    ) -> Self {
        Self {
            id,
            showtime_id,
            holder_id,
            status,
            created_at,
            items,
        }
    }

    pub fn id(&self) -> ReservationId {
        self.id
    }

    pub fn showtime_id(&self) -> ShowtimeId {
        self.showtime_id
    }

    pub fn holder_id(&self) -> HolderId {
        self.holder_id
    }

    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The immutable seat snapshots covered by this reservation.
    pub fn items(&self) -> &[ReservationItem] {
        &self.items
    }

    /// The ids of all seats covered by this reservation.
    pub fn seat_ids(&self) -> Vec<SeatId> {
        self.items.iter().map(|item| item.seat_id).collect()
    }

    /// Confirms the reservation.
    pub fn confirm(&mut self) -> Result<(), DomainError> {
        self.transition_to(ReservationStatus::Confirmed)
    }

    /// Marks the reservation expired (sweeper reclamation).
    pub fn mark_expired(&mut self) -> Result<(), DomainError> {
        self.transition_to(ReservationStatus::Expired)
    }

    /// Marks the reservation failed.
    pub fn mark_failed(&mut self) -> Result<(), DomainError> {
        self.transition_to(ReservationStatus::Failed)
    }

    fn transition_to(&mut self, next: ReservationStatus) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::ReservationClosed {
                status: self.status,
            });
        }

        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation() -> Reservation {
        let showtime_id = ShowtimeId::new();
        let seats = vec![
            Seat::new(showtime_id, "A", 1),
            Seat::new(showtime_id, "A", 2),
        ];
        let items = seats.iter().map(ReservationItem::from_seat).collect();
        Reservation::new(showtime_id, HolderId::new(), items, Utc::now()).unwrap()
    }

    #[test]
    fn new_reservation_is_pending() {
        let r = reservation();
        assert_eq!(r.status(), ReservationStatus::Pending);
        assert_eq!(r.items().len(), 2);
    }

    #[test]
    fn empty_item_set_is_rejected() {
        let err =
            Reservation::new(ShowtimeId::new(), HolderId::new(), vec![], Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::EmptyReservation);
    }

    #[test]
    fn items_snapshot_row_and_number() {
        let showtime_id = ShowtimeId::new();
        let seat = Seat::new(showtime_id, "G", 7);
        let item = ReservationItem::from_seat(&seat);

        assert_eq!(item.seat_id, seat.id());
        assert_eq!(item.row, "G");
        assert_eq!(item.number, 7);
    }

    #[test]
    fn pending_can_confirm() {
        let mut r = reservation();
        r.confirm().unwrap();
        assert_eq!(r.status(), ReservationStatus::Confirmed);
    }

    #[test]
    fn pending_can_expire() {
        let mut r = reservation();
        r.mark_expired().unwrap();
        assert_eq!(r.status(), ReservationStatus::Expired);
    }

    #[test]
    fn terminal_states_admit_no_transition() {
        let mut r = reservation();
        r.confirm().unwrap();

        let err = r.mark_expired().unwrap_err();
        assert_eq!(
            err,
            DomainError::ReservationClosed {
                status: ReservationStatus::Confirmed
            }
        );

        let mut r = reservation();
        r.mark_expired().unwrap();
        assert!(r.confirm().is_err());
        assert!(r.mark_failed().is_err());
    }

    #[test]
    fn terminal_flags() {
        assert!(!ReservationStatus::Pending.is_terminal());
        assert!(ReservationStatus::Confirmed.is_terminal());
        assert!(ReservationStatus::Expired.is_terminal());
        assert!(ReservationStatus::Failed.is_terminal());
    }
}
