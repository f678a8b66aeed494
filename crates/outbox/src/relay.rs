//! Polling relay draining the outbox into the broker.

use std::sync::Arc;
use std::time::Duration;

use common::Clock;
use metrics::counter;
use store::ReservationStore;
use tracing::{debug, warn};

use crate::error::RelayError;
use crate::publisher::EventPublisher;

/// Drains undelivered outbox events into the broker, oldest first.
///
/// Each event is marked delivered only after the broker acknowledged it, so
/// a crash between publish and mark re-delivers on the next poll. A publish
/// failure stops the current batch; the failed event and everything behind
/// it stay queued, which keeps delivery in staging order.
pub struct OutboxRelay<S, P> {
    store: Arc<S>,
    publisher: Arc<P>,
    clock: Arc<dyn Clock>,
    batch_size: usize,
}

impl<S, P> OutboxRelay<S, P>
where
    S: ReservationStore,
    P: EventPublisher,
{
    pub fn new(store: Arc<S>, publisher: Arc<P>, clock: Arc<dyn Clock>, batch_size: usize) -> Self {
        Self {
            store,
            publisher,
            clock,
            batch_size,
        }
    }

    /// Relays one batch and returns how many events were delivered.
    #[tracing::instrument(skip(self))]
    pub async fn relay_once(&self) -> Result<usize, RelayError> {
        let batch = self.store.undelivered_events(self.batch_size).await?;
        let mut delivered = 0;

        for event in &batch {
            if let Err(e) = self.publisher.publish(event).await {
                warn!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    error = %e,
                    "publish failed, leaving batch for next poll"
                );
                counter!("outbox_publish_failures_total").increment(1);
                break;
            }

            self.store
                .mark_delivered(event.event_id, self.clock.now())
                .await?;
            counter!("outbox_events_delivered_total").increment(1);
            delivered += 1;
        }

        if delivered > 0 {
            debug!(delivered, "relayed outbox batch");
        }

        Ok(delivered)
    }

    /// Runs the relay loop forever, polling at the given interval.
    pub async fn run(self, poll_interval: Duration) {
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.relay_once().await {
                warn!(error = %e, "outbox relay pass failed");
            }
        }
    }
}
