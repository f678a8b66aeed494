//! Domain layer for the seat reservation system.
//!
//! This crate provides the authoritative entities and their state machines:
//! - [`Seat`] with its Available → Reserved → Sold lifecycle
//! - [`Reservation`] aggregate with an immutable set of seat snapshots
//! - [`Showtime`] catalog entity
//! - [`DomainEvent`] facts emitted when state changes commit

pub mod error;
pub mod events;
pub mod reservation;
pub mod seat;
pub mod showtime;

pub use error::DomainError;
pub use events::{DomainEvent, ReservationExpiredData, ReservedSeat, SeatsReservedData};
pub use reservation::{Reservation, ReservationItem, ReservationStatus};
pub use seat::{Seat, SeatStatus};
pub use showtime::Showtime;
