//! Push notification fanout contract.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{HolderId, SeatId, ShowtimeId};
use domain::SeatStatus;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Unavailable(String),
}

/// One batched status message pushed to a showtime's subscribers.
///
/// Every seat touched by a single event travels in one message, so a
/// subscriber updating a seat map repaints once per reservation rather
/// than once per seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatStatusChange {
    pub seat_ids: Vec<SeatId>,
    pub status: SeatStatus,
    pub holder_id: Option<HolderId>,
}

/// Pushes seat-status messages to subscribers of a showtime.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        showtime_id: ShowtimeId,
        change: SeatStatusChange,
    ) -> Result<(), NotifyError>;
}

/// In-memory notifier recording every message per showtime.
pub struct InMemoryNotifier {
    sent: Arc<RwLock<HashMap<ShowtimeId, Vec<SeatStatusChange>>>>,
    fail_on_notify: Arc<RwLock<bool>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(RwLock::new(HashMap::new())),
            fail_on_notify: Arc::new(RwLock::new(false)),
        }
    }

    /// Test helper to simulate a transport outage.
    pub async fn set_fail_on_notify(&self, fail: bool) {
        *self.fail_on_notify.write().await = fail;
    }

    /// Returns every message pushed to the given showtime so far.
    pub async fn messages_for(&self, showtime_id: ShowtimeId) -> Vec<SeatStatusChange> {
        self.sent
            .read()
            .await
            .get(&showtime_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for InMemoryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(
        &self,
        showtime_id: ShowtimeId,
        change: SeatStatusChange,
    ) -> Result<(), NotifyError> {
        if *self.fail_on_notify.read().await {
            return Err(NotifyError::Unavailable(
                "simulated notifier failure".to_string(),
            ));
        }

        self.sent
            .write()
            .await
            .entry(showtime_id)
            .or_default()
            .push(change);
        Ok(())
    }
}
