//! Event processor driving projections and fanout.

use std::sync::Arc;

use domain::{DomainEvent, SeatStatus};
use metrics::counter;
use store::StagedEvent;
use tokio::sync::mpsc;
use tracing::warn;

use crate::notifier::{Notifier, SeatStatusChange};
use crate::projection::Projection;

/// Applies each broker event to every registered projection, then pushes
/// one batched seat-status message to the event's showtime group.
///
/// Projection failures are isolated per projection and fanout is
/// best-effort; neither ever stops the event stream.
pub struct ProjectionProcessor {
    projections: Vec<Arc<dyn Projection>>,
    notifier: Arc<dyn Notifier>,
}

impl ProjectionProcessor {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            projections: Vec::new(),
            notifier,
        }
    }

    /// Registers a projection to receive every event.
    pub fn register(&mut self, projection: Arc<dyn Projection>) {
        self.projections.push(projection);
    }

    /// Processes one event end to end.
    #[tracing::instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub async fn process_event(&self, event: &StagedEvent) {
        for projection in &self.projections {
            if let Err(e) = projection.apply(event).await {
                warn!(
                    projection = projection.name(),
                    event_id = %event.event_id,
                    error = %e,
                    "projection failed to apply event"
                );
                counter!("projection_failures_total").increment(1);
            }
        }
        counter!("projection_events_processed_total").increment(1);

        self.fan_out(event).await;
    }

    /// Translates the event into one batched status message and pushes it.
    async fn fan_out(&self, event: &StagedEvent) {
        let change = match event.domain_event() {
            Ok(DomainEvent::SeatsReserved(data)) => SeatStatusChange {
                seat_ids: data.items.iter().map(|item| item.seat_id).collect(),
                status: SeatStatus::Reserved,
                holder_id: Some(data.holder_id),
            },
            Ok(DomainEvent::ReservationExpired(data)) => SeatStatusChange {
                seat_ids: data.seat_ids,
                status: SeatStatus::Available,
                holder_id: None,
            },
            Err(e) => {
                warn!(event_id = %event.event_id, error = %e, "undecodable event, no fanout");
                return;
            }
        };

        if let Err(e) = self.notifier.notify(event.showtime_id, change).await {
            warn!(
                showtime_id = %event.showtime_id,
                error = %e,
                "notification fanout failed"
            );
            counter!("notification_failures_total").increment(1);
        }
    }

    /// Consumes the broker subscription until the channel closes.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<StagedEvent>) {
        while let Some(event) = events.recv().await {
            self.process_event(&event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{HolderId, ReservationId, ShowtimeId};
    use domain::{ReservationItem, Seat, Showtime};

    use crate::notifier::InMemoryNotifier;
    use crate::views::showtime::ShowtimeView;

    struct Fixture {
        processor: ProjectionProcessor,
        view: Arc<ShowtimeView>,
        notifier: Arc<InMemoryNotifier>,
        showtime: Showtime,
        seats: Vec<Seat>,
    }

    async fn fixture() -> Fixture {
        let showtime_id = ShowtimeId::new();
        let showtime = Showtime::new(showtime_id, "Processor Screening", Utc::now());
        let seats = vec![
            Seat::new(showtime_id, "A", 1),
            Seat::new(showtime_id, "A", 2),
        ];

        let view = Arc::new(ShowtimeView::new());
        view.seed_showtime(&showtime, &seats).await;

        let notifier = Arc::new(InMemoryNotifier::new());
        let mut processor = ProjectionProcessor::new(notifier.clone());
        processor.register(view.clone());

        Fixture {
            processor,
            view,
            notifier,
            showtime,
            seats,
        }
    }

    fn reserved_event(showtime_id: ShowtimeId, seats: &[Seat], holder: HolderId) -> StagedEvent {
        let items: Vec<ReservationItem> = seats.iter().map(ReservationItem::from_seat).collect();
        let event =
            DomainEvent::seats_reserved(showtime_id, ReservationId::new(), holder, &items);
        StagedEvent::stage(&event, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn projects_then_pushes_one_batched_message() {
        let f = fixture().await;
        let holder = HolderId::new();

        f.processor
            .process_event(&reserved_event(f.showtime.id, &f.seats, holder))
            .await;

        let document = f.view.document(f.showtime.id).await.unwrap();
        assert!(document
            .seats
            .iter()
            .all(|s| s.status == SeatStatus::Reserved));

        let messages = f.notifier.messages_for(f.showtime.id).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].seat_ids.len(), 2);
        assert_eq!(messages[0].status, SeatStatus::Reserved);
        assert_eq!(messages[0].holder_id, Some(holder));
    }

    #[tokio::test]
    async fn expiry_message_clears_the_holder() {
        let f = fixture().await;
        f.processor
            .process_event(&reserved_event(f.showtime.id, &f.seats, HolderId::new()))
            .await;

        let expiry = DomainEvent::reservation_expired(
            ReservationId::new(),
            f.showtime.id,
            vec![f.seats[0].id()],
        );
        f.processor
            .process_event(&StagedEvent::stage(&expiry, Utc::now()).unwrap())
            .await;

        let messages = f.notifier.messages_for(f.showtime.id).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].status, SeatStatus::Available);
        assert_eq!(messages[1].holder_id, None);
    }

    #[tokio::test]
    async fn notifier_outage_does_not_stop_projection() {
        let f = fixture().await;
        f.notifier.set_fail_on_notify(true).await;

        f.processor
            .process_event(&reserved_event(f.showtime.id, &f.seats, HolderId::new()))
            .await;

        // The read model advanced even though nothing was pushed.
        let document = f.view.document(f.showtime.id).await.unwrap();
        assert!(document
            .seats
            .iter()
            .all(|s| s.status == SeatStatus::Reserved));
        assert!(f.notifier.messages_for(f.showtime.id).await.is_empty());
    }

    #[tokio::test]
    async fn run_drains_the_subscription_until_close() {
        let f = fixture().await;
        let showtime_id = f.showtime.id;
        let view = f.view.clone();
        let notifier = f.notifier.clone();

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(f.processor.run(rx));

        tx.send(reserved_event(showtime_id, &f.seats, HolderId::new()))
            .unwrap();
        drop(tx);
        worker.await.unwrap();

        let document = view.document(showtime_id).await.unwrap();
        assert!(document
            .seats
            .iter()
            .all(|s| s.status == SeatStatus::Reserved));
        assert_eq!(notifier.messages_for(showtime_id).await.len(), 1);
    }
}
