//! Reservation workflow.
//!
//! The orchestrator runs the gated reserve protocol over a lock service and
//! the authoritative store; the sweeper reclaims reservations whose holders
//! never followed through.

pub mod error;
pub mod orchestrator;
pub mod sweeper;

pub use error::ReserveError;
pub use orchestrator::{ReservationOrchestrator, ReservationReceipt};
pub use sweeper::ReclamationSweeper;
