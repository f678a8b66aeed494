//! Domain events emitted when authoritative state changes commit.
//!
//! Events are staged in the outbox inside the same transaction as the state
//! mutation and delivered to consumers at-least-once, so every consumer must
//! apply them idempotently.

use common::{HolderId, ReservationId, SeatId, ShowtimeId};
use serde::{Deserialize, Serialize};

use crate::reservation::ReservationItem;

/// A seat covered by a [`SeatsReservedData`] event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedSeat {
    pub seat_id: SeatId,
    pub row: String,
    pub number: i32,
}

impl From<&ReservationItem> for ReservedSeat {
    fn from(item: &ReservationItem) -> Self {
        Self {
            seat_id: item.seat_id,
            row: item.row.clone(),
            number: item.number,
        }
    }
}

/// Payload of the `SeatsReserved` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatsReservedData {
    pub showtime_id: ShowtimeId,
    pub reservation_id: ReservationId,
    pub holder_id: HolderId,
    pub items: Vec<ReservedSeat>,
}

/// Payload of the `ReservationExpired` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationExpiredData {
    pub reservation_id: ReservationId,
    pub showtime_id: ShowtimeId,
    pub seat_ids: Vec<SeatId>,
}

/// A domain fact published to downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DomainEvent {
    /// A holder reserved a batch of seats.
    SeatsReserved(SeatsReservedData),

    /// A pending reservation passed its deadline and its seats were released.
    ReservationExpired(ReservationExpiredData),
}

impl DomainEvent {
    /// Builds a `SeatsReserved` fact covering every item of a reservation.
    pub fn seats_reserved(
        showtime_id: ShowtimeId,
        reservation_id: ReservationId,
        holder_id: HolderId,
        items: &[ReservationItem],
    ) -> Self {
        DomainEvent::SeatsReserved(SeatsReservedData {
            showtime_id,
            reservation_id,
            holder_id,
            items: items.iter().map(ReservedSeat::from).collect(),
        })
    }

    /// Builds a `ReservationExpired` fact for the released seats.
    pub fn reservation_expired(
        reservation_id: ReservationId,
        showtime_id: ShowtimeId,
        seat_ids: Vec<SeatId>,
    ) -> Self {
        DomainEvent::ReservationExpired(ReservationExpiredData {
            reservation_id,
            showtime_id,
            seat_ids,
        })
    }

    /// Returns the event type name used on the wire.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::SeatsReserved(_) => "SeatsReserved",
            DomainEvent::ReservationExpired(_) => "ReservationExpired",
        }
    }

    /// Returns the showtime this event is scoped to.
    pub fn showtime_id(&self) -> ShowtimeId {
        match self {
            DomainEvent::SeatsReserved(data) => data.showtime_id,
            DomainEvent::ReservationExpired(data) => data.showtime_id,
        }
    }
}
