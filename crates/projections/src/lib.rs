//! Read models and notification fanout.
//!
//! Projections consume the broker's event stream and maintain denormalized
//! per-showtime documents for queries. Delivery is at-least-once, so every
//! projection applies events idempotently. After projecting, the processor
//! pushes one batched seat-status message per event to subscribers of the
//! showtime; that fanout is best-effort and never fails the projection.

pub mod error;
pub mod notifier;
pub mod processor;
pub mod projection;
pub mod views;

pub use error::ProjectionError;
pub use notifier::{InMemoryNotifier, Notifier, NotifyError, SeatStatusChange};
pub use processor::ProjectionProcessor;
pub use projection::Projection;
pub use views::showtime::{SeatEntry, ShowtimeDocument, ShowtimeView};

/// Convenience result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
