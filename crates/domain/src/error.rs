//! Domain error types.

use common::SeatId;
use thiserror::Error;

use crate::reservation::ReservationStatus;

/// Errors raised by the entity state machines.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// The seat has been sold; reserving it can never succeed.
    #[error("seat {seat_id} is already sold")]
    AlreadySold { seat_id: SeatId },

    /// A sale can only be confirmed for a seat that is currently reserved.
    #[error("seat {seat_id} is not reserved and cannot be sold")]
    NotReserved { seat_id: SeatId },

    /// A reservation must cover at least one seat.
    #[error("a reservation must contain at least one seat")]
    EmptyReservation,

    /// The reservation has already reached a terminal state.
    #[error("reservation is already {status}, no further transitions allowed")]
    ReservationClosed { status: ReservationStatus },
}
