//! Distributed seat locks.
//!
//! The lock service is the first gate of the reservation workflow: a request
//! must acquire short-lived locks on every seat it wants, all-or-nothing,
//! before the authoritative store is touched. Locks carry a TTL so that a
//! crashed or abandoned workflow never leaves a seat wedged.

pub mod error;
pub mod memory;
pub mod redis;
pub mod service;

pub use error::LockError;
pub use memory::InMemorySeatLocks;
pub use redis::RedisSeatLocks;
pub use service::SeatLockService;
