//! Per-showtime seat map read model.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{HolderId, SeatId, ShowtimeId};
use domain::{DomainEvent, Seat, SeatStatus, Showtime};
use serde::Serialize;
use store::StagedEvent;
use tokio::sync::RwLock;
use tracing::warn;

use crate::Result;
use crate::projection::Projection;

/// One seat inside a [`ShowtimeDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatEntry {
    pub seat_id: SeatId,
    pub row: String,
    pub number: i32,
    pub status: SeatStatus,
    pub reserver_id: Option<HolderId>,
}

/// Denormalized document answering "what does this showtime's seat map look
/// like right now" in a single read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShowtimeDocument {
    pub id: ShowtimeId,
    pub movie_title: String,
    pub start_time: DateTime<Utc>,
    pub seats: Vec<SeatEntry>,
}

/// Projection maintaining one [`ShowtimeDocument`] per showtime.
///
/// Documents are seeded from the catalog when a showtime is created and
/// mutated only by applying broker events. Both event kinds write absolute
/// seat states rather than deltas, which is what makes re-applying a
/// duplicate delivery harmless.
pub struct ShowtimeView {
    documents: Arc<RwLock<HashMap<ShowtimeId, ShowtimeDocument>>>,
}

impl ShowtimeView {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Seeds the document for a freshly created showtime.
    pub async fn seed_showtime(&self, showtime: &Showtime, seats: &[Seat]) {
        let entries = seats
            .iter()
            .map(|seat| SeatEntry {
                seat_id: seat.id(),
                row: seat.row().to_string(),
                number: seat.number(),
                status: seat.status(),
                reserver_id: seat.reserver_id(),
            })
            .collect();

        self.documents.write().await.insert(
            showtime.id,
            ShowtimeDocument {
                id: showtime.id,
                movie_title: showtime.movie_title.clone(),
                start_time: showtime.start_time,
                seats: entries,
            },
        );
    }

    /// Returns the current document for a showtime.
    pub async fn document(&self, showtime_id: ShowtimeId) -> Option<ShowtimeDocument> {
        self.documents.read().await.get(&showtime_id).cloned()
    }
}

impl Default for ShowtimeView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for ShowtimeView {
    fn name(&self) -> &'static str {
        "showtime_view"
    }

    async fn apply(&self, event: &StagedEvent) -> Result<()> {
        let domain_event = event.domain_event()?;
        let mut documents = self.documents.write().await;

        let Some(document) = documents.get_mut(&event.showtime_id) else {
            warn!(showtime_id = %event.showtime_id, "event for unseeded showtime dropped");
            return Ok(());
        };

        match domain_event {
            DomainEvent::SeatsReserved(data) => {
                for item in &data.items {
                    match document.seats.iter_mut().find(|s| s.seat_id == item.seat_id) {
                        Some(entry) => {
                            entry.status = SeatStatus::Reserved;
                            entry.reserver_id = Some(data.holder_id);
                        }
                        // Seat missing from the seeded document; the event
                        // carries enough of a snapshot to upsert it.
                        None => document.seats.push(SeatEntry {
                            seat_id: item.seat_id,
                            row: item.row.clone(),
                            number: item.number,
                            status: SeatStatus::Reserved,
                            reserver_id: Some(data.holder_id),
                        }),
                    }
                }
            }
            DomainEvent::ReservationExpired(data) => {
                for entry in document
                    .seats
                    .iter_mut()
                    .filter(|s| data.seat_ids.contains(&s.seat_id))
                {
                    entry.status = SeatStatus::Available;
                    entry.reserver_id = None;
                }
            }
        }

        Ok(())
    }
}
