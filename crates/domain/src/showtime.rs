//! Showtime catalog entity.

use chrono::{DateTime, Utc};
use common::ShowtimeId;
use serde::{Deserialize, Serialize};

/// A scheduled screening that owns a set of seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Showtime {
    pub id: ShowtimeId,
    pub movie_title: String,
    pub start_time: DateTime<Utc>,
}

impl Showtime {
    /// Creates a new showtime.
    pub fn new(id: ShowtimeId, movie_title: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            id,
            movie_title: movie_title.into(),
            start_time,
        }
    }
}
