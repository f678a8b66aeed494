//! Durable outbox record.

use chrono::{DateTime, Utc};
use common::{EventId, ShowtimeId};
use domain::DomainEvent;
use serde::{Deserialize, Serialize};

/// A domain event staged for delivery.
///
/// Written in the same transaction as the state mutation it describes and
/// relayed to the broker at-least-once. `delivered_at` is set only after the
/// broker acknowledged the publish, so a crash between publish and
/// acknowledgment re-delivers the event — consumers must apply idempotently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedEvent {
    pub event_id: EventId,
    pub event_type: String,
    pub showtime_id: ShowtimeId,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl StagedEvent {
    /// Stages a domain event for delivery.
    pub fn stage(event: &DomainEvent, at: DateTime<Utc>) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event_id: EventId::new(),
            event_type: event.event_type().to_string(),
            showtime_id: event.showtime_id(),
            payload: serde_json::to_value(event)?,
            created_at: at,
            delivered_at: None,
        })
    }

    /// Decodes the staged payload back into a domain event.
    pub fn domain_event(&self) -> Result<DomainEvent, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    /// Returns true once the broker has acknowledged this event.
    pub fn is_delivered(&self) -> bool {
        self.delivered_at.is_some()
    }
}
