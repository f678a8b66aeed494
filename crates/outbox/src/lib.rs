//! Outbox relay.
//!
//! State changes stage their events in the store's outbox transactionally;
//! this crate drains that outbox and hands the events to a broker. Delivery
//! is at-least-once: an event is marked delivered only after the broker
//! acknowledges it, and a failure mid-batch leaves the remainder for the
//! next poll so order per showtime is preserved.

pub mod error;
pub mod publisher;
pub mod relay;

pub use error::RelayError;
pub use publisher::{EventPublisher, InMemoryBroker, PublishError};
pub use relay::OutboxRelay;
