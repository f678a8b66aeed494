//! In-memory lock service for tests and single-process deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::{Clock, HolderId, SeatId, ShowtimeId};
use tokio::sync::RwLock;

use crate::error::LockError;
use crate::service::SeatLockService;

#[derive(Debug, Clone)]
struct LockEntry {
    holder_id: HolderId,
    expires_at: DateTime<Utc>,
}

/// In-memory implementation of [`SeatLockService`].
///
/// Expiry is evaluated lazily against the injected clock on every access,
/// so tests can drive TTL behavior with a `ManualClock`.
pub struct InMemorySeatLocks {
    locks: Arc<RwLock<HashMap<(ShowtimeId, SeatId), LockEntry>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    fail_on_lock: Arc<RwLock<bool>>,
}

impl InMemorySeatLocks {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            locks: Arc::new(RwLock::new(HashMap::new())),
            clock,
            ttl,
            fail_on_lock: Arc::new(RwLock::new(false)),
        }
    }

    /// Test helper to simulate a backend outage.
    pub async fn set_fail_on_lock(&self, fail: bool) {
        *self.fail_on_lock.write().await = fail;
    }

    /// Test helper to inspect whether a seat is currently locked.
    pub async fn is_locked(&self, showtime_id: ShowtimeId, seat_id: SeatId) -> bool {
        let now = self.clock.now();
        self.locks
            .read()
            .await
            .get(&(showtime_id, seat_id))
            .is_some_and(|entry| entry.expires_at > now)
    }

    /// Test helper to inspect the current holder of a seat lock.
    pub async fn holder_of(&self, showtime_id: ShowtimeId, seat_id: SeatId) -> Option<HolderId> {
        let now = self.clock.now();
        self.locks
            .read()
            .await
            .get(&(showtime_id, seat_id))
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.holder_id)
    }

    /// Test helper returning the number of live locks.
    pub async fn lock_count(&self) -> usize {
        let now = self.clock.now();
        self.locks
            .read()
            .await
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }
}

#[async_trait]
impl SeatLockService for InMemorySeatLocks {
    async fn try_lock_seats(
        &self,
        showtime_id: ShowtimeId,
        seat_ids: &[SeatId],
        holder_id: HolderId,
    ) -> Result<bool, LockError> {
        if *self.fail_on_lock.read().await {
            return Err(LockError::Unavailable("simulated lock failure".into()));
        }

        let now = self.clock.now();
        let mut locks = self.locks.write().await;

        // Drop expired entries so the map does not grow unboundedly.
        locks.retain(|_, entry| entry.expires_at > now);

        // All-or-nothing: check every seat before taking anything.
        if seat_ids
            .iter()
            .any(|seat_id| locks.contains_key(&(showtime_id, *seat_id)))
        {
            return Ok(false);
        }

        let expires_at = now + self.ttl;
        for seat_id in seat_ids {
            locks.insert(
                (showtime_id, *seat_id),
                LockEntry {
                    holder_id,
                    expires_at,
                },
            );
        }

        Ok(true)
    }

    async fn release_locks(
        &self,
        showtime_id: ShowtimeId,
        seat_ids: &[SeatId],
    ) -> Result<(), LockError> {
        let mut locks = self.locks.write().await;
        for seat_id in seat_ids {
            locks.remove(&(showtime_id, *seat_id));
        }
        Ok(())
    }
}
