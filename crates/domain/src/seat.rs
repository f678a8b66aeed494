//! Seat entity and its state machine.

use common::{HolderId, SeatId, ShowtimeId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The state of a seat.
///
/// ```text
/// Available ──reserve──► Reserved ──confirm_sale──► Sold
///     ▲                      │
///     └──────release─────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SeatStatus {
    /// Free for anyone to reserve.
    #[default]
    Available,

    /// Held by a pending reservation.
    Reserved,

    /// Sold; a permanent, terminal state.
    Sold,
}

impl SeatStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "Available",
            SeatStatus::Reserved => "Reserved",
            SeatStatus::Sold => "Sold",
        }
    }

    /// Parses a status from its string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Available" => Some(SeatStatus::Available),
            "Reserved" => Some(SeatStatus::Reserved),
            "Sold" => Some(SeatStatus::Sold),
            _ => None,
        }
    }
}

impl std::fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A seat in a showtime's auditorium.
///
/// Identity is showtime + row + number; created once at showtime setup and
/// mutated only through the state-machine methods below. The `version` field
/// is the optimistic-concurrency token checked by the store on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    id: SeatId,
    showtime_id: ShowtimeId,
    row: String,
    number: i32,
    status: SeatStatus,
    reserver_id: Option<HolderId>,
    version: i64,
}

impl Seat {
    /// Creates a new available seat for a showtime.
    pub fn new(showtime_id: ShowtimeId, row: impl Into<String>, number: i32) -> Self {
        Self {
            id: SeatId::new(),
            showtime_id,
            row: row.into(),
            number,
            status: SeatStatus::Available,
            reserver_id: None,
            version: 0,
        }
    }

    /// Rehydrates a seat from stored fields.
    pub fn from_parts(
        id: SeatId,
        showtime_id: ShowtimeId,
        row: String,
        number: i32,
        status: SeatStatus,
        reserver_id: Option<HolderId>,
        version: i64,
    ) -> Self {
        Self {
            id,
            showtime_id,
            row,
            number,
            status,
            reserver_id,
            version,
        }
    }

    pub fn id(&self) -> SeatId {
        self.id
    }

    pub fn showtime_id(&self) -> ShowtimeId {
        self.showtime_id
    }

    pub fn row(&self) -> &str {
        &self.row
    }

    pub fn number(&self) -> i32 {
        self.number
    }

    pub fn status(&self) -> SeatStatus {
        self.status
    }

    /// The holder currently associated with the seat.
    ///
    /// `None` whenever the seat is available.
    pub fn reserver_id(&self) -> Option<HolderId> {
        self.reserver_id
    }

    /// The version this entity was loaded at.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Marks the seat reserved by the given holder.
    ///
    /// Reserving an already-reserved seat is allowed here: the distributed
    /// lock is the gatekeeper for contention, and the store's version check
    /// rejects stale writers. A sold seat can never be reserved again.
    pub fn reserve(&mut self, holder_id: HolderId) -> Result<(), DomainError> {
        if self.status == SeatStatus::Sold {
            return Err(DomainError::AlreadySold { seat_id: self.id });
        }

        self.status = SeatStatus::Reserved;
        self.reserver_id = Some(holder_id);
        Ok(())
    }

    /// Confirms the sale of a reserved seat.
    pub fn confirm_sale(&mut self) -> Result<(), DomainError> {
        if self.status != SeatStatus::Reserved {
            return Err(DomainError::NotReserved { seat_id: self.id });
        }

        self.status = SeatStatus::Sold;
        Ok(())
    }

    /// Returns the seat to the available pool, clearing the holder.
    ///
    /// Unconditional: the sweeper releasing an expired reservation does not
    /// need to know who currently holds the seat.
    pub fn release(&mut self) {
        self.status = SeatStatus::Available;
        self.reserver_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat() -> Seat {
        Seat::new(ShowtimeId::new(), "A", 1)
    }

    #[test]
    fn new_seat_is_available_with_no_holder() {
        let seat = seat();
        assert_eq!(seat.status(), SeatStatus::Available);
        assert_eq!(seat.reserver_id(), None);
        assert_eq!(seat.version(), 0);
    }

    #[test]
    fn reserve_sets_holder() {
        let mut seat = seat();
        let holder = HolderId::new();

        seat.reserve(holder).unwrap();

        assert_eq!(seat.status(), SeatStatus::Reserved);
        assert_eq!(seat.reserver_id(), Some(holder));
    }

    #[test]
    fn reserve_over_existing_reservation_swaps_holder() {
        let mut seat = seat();
        seat.reserve(HolderId::new()).unwrap();

        let newcomer = HolderId::new();
        seat.reserve(newcomer).unwrap();

        assert_eq!(seat.reserver_id(), Some(newcomer));
    }

    #[test]
    fn reserve_sold_seat_fails() {
        let mut seat = seat();
        seat.reserve(HolderId::new()).unwrap();
        seat.confirm_sale().unwrap();

        let err = seat.reserve(HolderId::new()).unwrap_err();
        assert_eq!(
            err,
            DomainError::AlreadySold {
                seat_id: seat.id()
            }
        );
        assert_eq!(seat.status(), SeatStatus::Sold);
    }

    #[test]
    fn confirm_sale_requires_reserved() {
        let mut seat = seat();
        let err = seat.confirm_sale().unwrap_err();
        assert!(matches!(err, DomainError::NotReserved { .. }));
    }

    #[test]
    fn release_is_unconditional_and_clears_holder() {
        let mut seat = seat();
        seat.reserve(HolderId::new()).unwrap();

        seat.release();

        assert_eq!(seat.status(), SeatStatus::Available);
        assert_eq!(seat.reserver_id(), None);

        // Releasing an already-available seat is a no-op.
        seat.release();
        assert_eq!(seat.status(), SeatStatus::Available);
    }

    #[test]
    fn status_round_trips_through_string() {
        for status in [SeatStatus::Available, SeatStatus::Reserved, SeatStatus::Sold] {
            assert_eq!(SeatStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SeatStatus::parse("Broken"), None);
    }
}
