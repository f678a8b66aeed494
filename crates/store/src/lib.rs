//! Authoritative store for seats and reservations.
//!
//! The store is the single source of truth. Every seat write is conditional
//! on the version the entity was loaded at, and every state-changing commit
//! carries its outbox record in the same atomic unit, so an event is observed
//! downstream if and only if the mutation it describes committed.

pub mod error;
pub mod memory;
pub mod outbox;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use outbox::StagedEvent;
pub use postgres::PostgresStore;
pub use store::ReservationStore;
