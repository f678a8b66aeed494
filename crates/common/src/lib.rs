//! Shared building blocks for the seat reservation system.
//!
//! Provides the typed identifiers used across crate boundaries and the
//! [`Clock`] abstraction that makes time-dependent components (lock TTLs,
//! the reclamation sweeper) testable with a fake clock.

pub mod clock;
pub mod ids;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ids::{EventId, HolderId, ReservationId, SeatId, ShowtimeId};
